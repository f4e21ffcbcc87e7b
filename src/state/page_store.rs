use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use crate::io::backend::{Backend, Collection, Filter, Order};
use crate::io::object_storage::ObjectStorage;
use crate::io::records::{self, PageRecord};
use crate::state::blocks::{Block, BlockId, BlockKind, BlockType};
use crate::state::data_model::{new_id, normalize_name};
use crate::state::error::{StoreError, StoreResult};
use crate::state::history::BlockHistory;

pub type PageId = String;

pub const DEFAULT_PAGE_NAME: &str = "Untitled Page";

#[derive(Clone, Debug, PartialEq)]
pub struct Page {
    pub id: PageId,
    pub name: String,
    pub slug: String,
    pub is_published: bool,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub blocks: Vec<Block>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PageMetaUpdate {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub is_published: Option<bool>,
}

impl Page {
    pub fn block(&self, block_id: &str) -> Option<&Block> {
        self.blocks.iter().find(|block| block.id == block_id)
    }

    pub fn block_index(&self, block_id: &str) -> Option<usize> {
        self.blocks.iter().position(|block| block.id == block_id)
    }

    fn from_record(record: PageRecord) -> Self {
        let blocks = blocks_from_content(&record.id, record.content);
        Self {
            id: record.id,
            name: record.title,
            slug: record.slug,
            is_published: record.is_published,
            created_at: record.created_at,
            updated_at: record.updated_at,
            blocks,
        }
    }
}

/// Lowercases `name`, collapses every run of non-alphanumerics to `-` and
/// trims dashes from both ends.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for ch in name.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch);
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Pages of the signed-in user and the block editor state of each page.
pub struct PageStore<B: Backend> {
    backend: Arc<B>,
    pages: BTreeMap<PageId, Page>,
    page_order: Vec<PageId>,
    histories: BTreeMap<PageId, BlockHistory>,
    active_page_id: Option<PageId>,
    error: Option<String>,
}

impl<B: Backend> PageStore<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            pages: BTreeMap::new(),
            page_order: Vec::new(),
            histories: BTreeMap::new(),
            active_page_id: None,
            error: None,
        }
    }

    /// Pages in display order, most recently updated first.
    pub fn pages(&self) -> impl Iterator<Item = &Page> + '_ {
        self.page_order.iter().filter_map(|id| self.pages.get(id))
    }

    pub fn page(&self, page_id: &str) -> Option<&Page> {
        self.pages.get(page_id)
    }

    pub fn active_page(&self) -> Option<&Page> {
        self.active_page_id
            .as_deref()
            .and_then(|id| self.pages.get(id))
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn set_active_page(&mut self, page_id: Option<&str>) -> StoreResult<()> {
        match page_id {
            Some(id) if !self.pages.contains_key(id) => Err(StoreError::PageNotFound(id.to_string())),
            _ => {
                self.active_page_id = page_id.map(str::to_string);
                Ok(())
            }
        }
    }

    /// Case-insensitive title search. A blank query matches every page.
    pub fn search_pages(&self, query: &str) -> Vec<&Page> {
        let needle = query.trim().to_lowercase();
        self.pages()
            .filter(|page| needle.is_empty() || page.name.to_lowercase().contains(&needle))
            .collect()
    }

    pub async fn fetch_pages(&mut self) -> StoreResult<usize> {
        let result = self.try_fetch_pages().await;
        self.finish("fetch_pages", result)
    }

    pub async fn create_page(&mut self, name: &str) -> StoreResult<PageId> {
        let result = self.try_create_page(name).await;
        self.finish("create_page", result)
    }

    /// Reloads one page from the backend, resets its history and makes it
    /// the active page.
    pub async fn load_page(&mut self, page_id: &str) -> StoreResult<()> {
        let result = self.try_load_page(page_id).await;
        self.finish("load_page", result)
    }

    pub async fn update_page_meta(&mut self, page_id: &str, update: PageMetaUpdate) -> StoreResult<()> {
        let result = self.try_update_page_meta(page_id, update).await;
        self.finish("update_page_meta", result)
    }

    /// Persists the page's block list as its JSON content.
    pub async fn save_page(&mut self, page_id: &str) -> StoreResult<()> {
        let result = self.try_save_page(page_id).await;
        self.finish("save_page", result)
    }

    pub async fn delete_page(&mut self, page_id: &str) -> StoreResult<()> {
        let result = self.try_delete_page(page_id).await;
        self.finish("delete_page", result)
    }

    /// Inserts `block` after `after`, or at the front when `after` is `None`.
    pub fn insert_block_after(
        &mut self,
        page_id: &str,
        after: Option<&str>,
        block: Block,
    ) -> StoreResult<BlockId> {
        self.edit_structure(page_id, |page| {
            let index = match after {
                Some(after) => block_position(page, after)? + 1,
                None => 0,
            };
            let id = block.id.clone();
            page.blocks.insert(index, block);
            Ok(id)
        })
    }

    /// Removes a block. Removing the last block leaves one empty text block.
    pub fn delete_block(&mut self, page_id: &str, block_id: &str) -> StoreResult<()> {
        self.edit_structure(page_id, |page| {
            let index = block_position(page, block_id)?;
            page.blocks.remove(index);
            Ok(())
        })
    }

    pub fn duplicate_block(&mut self, page_id: &str, block_id: &str) -> StoreResult<BlockId> {
        self.edit_structure(page_id, |page| {
            let index = block_position(page, block_id)?;
            let copy = page.blocks[index].duplicate();
            let id = copy.id.clone();
            page.blocks.insert(index + 1, copy);
            Ok(id)
        })
    }

    pub fn reorder_blocks(&mut self, page_id: &str, from: usize, to: usize) -> StoreResult<()> {
        let len = self.page_ref(page_id)?.blocks.len();
        if from >= len || to >= len {
            return Err(StoreError::Validation(format!(
                "cannot move block {from} to {to} on a page of {len} blocks"
            )));
        }
        if from == to {
            return Ok(());
        }
        self.edit_structure(page_id, |page| {
            let block = page.blocks.remove(from);
            page.blocks.insert(to, block);
            Ok(())
        })
    }

    /// Replaces a block in place with an empty block of `block_type`. The old
    /// content is discarded.
    pub fn transform_block(
        &mut self,
        page_id: &str,
        block_id: &str,
        block_type: BlockType,
    ) -> StoreResult<BlockId> {
        self.edit_structure(page_id, |page| {
            let index = block_position(page, block_id)?;
            let block = Block::fresh(block_type);
            let id = block.id.clone();
            page.blocks[index] = block;
            Ok(id)
        })
    }

    /// Content edit. Updates the current history snapshot instead of
    /// pushing a new one.
    pub fn update_block(&mut self, page_id: &str, block_id: &str, kind: BlockKind) -> StoreResult<()> {
        let page = self.page_mut(page_id)?;
        let index = block_position(page, block_id)?;
        page.blocks[index].kind = kind;
        self.amend_history(page_id);
        Ok(())
    }

    /// Uploads an image and points the image block at the returned URL.
    pub async fn attach_image<S: ObjectStorage + ?Sized>(
        &mut self,
        storage: &S,
        page_id: &str,
        block_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> StoreResult<String> {
        let result = self
            .try_attach_image(storage, page_id, block_id, file_name, bytes)
            .await;
        self.finish("attach_image", result)
    }

    pub fn undo(&mut self, page_id: &str) -> StoreResult<bool> {
        self.step_history(page_id, BlockHistory::undo)
    }

    pub fn redo(&mut self, page_id: &str) -> StoreResult<bool> {
        self.step_history(page_id, BlockHistory::redo)
    }

    pub fn can_undo(&self, page_id: &str) -> bool {
        self.histories
            .get(page_id)
            .is_some_and(BlockHistory::can_undo)
    }

    pub fn can_redo(&self, page_id: &str) -> bool {
        self.histories
            .get(page_id)
            .is_some_and(BlockHistory::can_redo)
    }

    async fn try_fetch_pages(&mut self) -> StoreResult<usize> {
        let user = self.require_user().await?;
        let found = self
            .backend
            .select(
                Collection::Pages,
                &Filter::new().eq("user_id", user.as_str()),
                Some(&Order::desc("updated_at")),
            )
            .await?;
        let page_records: Vec<PageRecord> = records::from_records(found)?;

        self.pages.clear();
        self.page_order.clear();
        self.histories.clear();
        for record in page_records {
            self.insert_page(Page::from_record(record), self.page_order.len());
        }
        if self
            .active_page_id
            .as_ref()
            .is_some_and(|id| !self.pages.contains_key(id))
        {
            self.active_page_id = None;
        }

        tracing::debug!(count = self.page_order.len(), "loaded pages");
        Ok(self.page_order.len())
    }

    async fn try_create_page(&mut self, name: &str) -> StoreResult<PageId> {
        let user = self.require_user().await?;
        let name = normalize_name(name, DEFAULT_PAGE_NAME);
        let slug = match slugify(&name) {
            slug if slug.is_empty() => slugify(DEFAULT_PAGE_NAME),
            slug => slug,
        };
        let page = Page {
            id: new_id(),
            name,
            slug,
            is_published: false,
            created_at: None,
            updated_at: None,
            blocks: vec![Block::text()],
        };
        let page_id = page.id.clone();
        let record = page_record(&user, &page)?;

        self.insert_page(page, 0);
        let previous_active = self.active_page_id.replace(page_id.clone());

        let inserted = self
            .backend
            .insert(Collection::Pages, vec![records::to_record(&record)?])
            .await;
        match inserted {
            Ok(stored) => {
                if let Some(stored) = records::from_records::<PageRecord>(stored)?.into_iter().next() {
                    self.apply_timestamps(&page_id, stored.created_at, stored.updated_at);
                }
            }
            Err(err) => {
                self.remove_page(&page_id);
                self.active_page_id = previous_active;
                return Err(err.into());
            }
        }

        tracing::debug!(page_id = %page_id, "created page");
        Ok(page_id)
    }

    async fn try_load_page(&mut self, page_id: &str) -> StoreResult<()> {
        let user = self.require_user().await?;
        let found = self
            .backend
            .select(
                Collection::Pages,
                &Filter::new().eq("id", page_id).eq("user_id", user.as_str()),
                None,
            )
            .await?;
        let Some(record) = records::from_records::<PageRecord>(found)?.into_iter().next() else {
            return Err(StoreError::PageNotFound(page_id.to_string()));
        };

        let page = Page::from_record(record);
        let position = self
            .page_order
            .iter()
            .position(|id| id == page_id)
            .unwrap_or(self.page_order.len());
        self.remove_page(page_id);
        self.insert_page(page, position);
        self.active_page_id = Some(page_id.to_string());
        Ok(())
    }

    async fn try_update_page_meta(&mut self, page_id: &str, update: PageMetaUpdate) -> StoreResult<()> {
        self.require_user().await?;
        let page = self.page_mut(page_id)?;
        let previous = (page.name.clone(), page.slug.clone(), page.is_published);

        if let Some(name) = update.name {
            page.name = normalize_name(&name, DEFAULT_PAGE_NAME);
        }
        if let Some(slug) = update.slug {
            let slug = slugify(&slug);
            if slug.is_empty() {
                page.name = previous.0;
                return Err(StoreError::Validation("page slug cannot be empty".to_string()));
            }
            page.slug = slug;
        }
        if let Some(is_published) = update.is_published {
            page.is_published = is_published;
        }
        let patch = records::patch([
            ("title", Value::String(page.name.clone())),
            ("slug", Value::String(page.slug.clone())),
            ("is_published", Value::Bool(page.is_published)),
        ]);

        let persisted = self
            .backend
            .update(Collection::Pages, &Filter::new().eq("id", page_id), patch)
            .await;
        if let Err(err) = persisted {
            if let Some(page) = self.pages.get_mut(page_id) {
                (page.name, page.slug, page.is_published) = previous;
            }
            return Err(err.into());
        }
        self.refresh_timestamps(page_id).await;
        Ok(())
    }

    async fn try_save_page(&mut self, page_id: &str) -> StoreResult<()> {
        self.require_user().await?;
        let content = serde_json::to_value(&self.page_ref(page_id)?.blocks)
            .map_err(crate::io::backend::BackendError::from)?;
        self.backend
            .update(
                Collection::Pages,
                &Filter::new().eq("id", page_id),
                records::patch([("content", content)]),
            )
            .await?;
        self.refresh_timestamps(page_id).await;
        tracing::debug!(page_id, "saved page content");
        Ok(())
    }

    async fn try_delete_page(&mut self, page_id: &str) -> StoreResult<()> {
        self.require_user().await?;
        let position = self
            .page_order
            .iter()
            .position(|id| id == page_id)
            .ok_or_else(|| StoreError::PageNotFound(page_id.to_string()))?;
        let Some((page, history)) = self.remove_page(page_id) else {
            return Err(StoreError::PageNotFound(page_id.to_string()));
        };
        let previous_active = self.active_page_id.clone();
        if previous_active.as_deref() == Some(page_id) {
            self.active_page_id = None;
        }

        let persisted = self
            .backend
            .delete(Collection::Pages, &Filter::new().eq("id", page_id))
            .await;
        if let Err(err) = persisted {
            self.insert_page(page, position);
            self.histories.insert(page_id.to_string(), history);
            self.active_page_id = previous_active;
            return Err(err.into());
        }

        tracing::debug!(page_id, "deleted page");
        Ok(())
    }

    async fn try_attach_image<S: ObjectStorage + ?Sized>(
        &mut self,
        storage: &S,
        page_id: &str,
        block_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> StoreResult<String> {
        let page = self.page_ref(page_id)?;
        let block = page
            .block(block_id)
            .ok_or_else(|| block_not_found(page_id, block_id))?;
        if block.block_type() != BlockType::Image {
            return Err(StoreError::Validation(format!(
                "block '{block_id}' is a {} block, not an image",
                block.block_type().as_str()
            )));
        }

        let url = storage.upload(file_name, bytes).await?;

        // The page may have changed while the upload was in flight.
        let page = self.page_mut(page_id)?;
        let index = block_position(page, block_id)?;
        if let BlockKind::Image { url: current, .. } = &mut page.blocks[index].kind {
            *current = url.clone();
        }
        self.amend_history(page_id);
        Ok(url)
    }

    fn edit_structure<T>(
        &mut self,
        page_id: &str,
        edit: impl FnOnce(&mut Page) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let page = self.page_mut(page_id)?;
        let value = edit(page)?;
        if page.blocks.is_empty() {
            page.blocks.push(Block::text());
        }
        let snapshot = page.blocks.clone();
        if let Some(history) = self.histories.get_mut(page_id) {
            history.record(snapshot);
        }
        Ok(value)
    }

    fn amend_history(&mut self, page_id: &str) {
        if let (Some(page), Some(history)) = (self.pages.get(page_id), self.histories.get_mut(page_id)) {
            history.amend(page.blocks.clone());
        }
    }

    fn step_history(
        &mut self,
        page_id: &str,
        step: impl FnOnce(&mut BlockHistory) -> Option<&[Block]>,
    ) -> StoreResult<bool> {
        let history = self
            .histories
            .get_mut(page_id)
            .ok_or_else(|| StoreError::PageNotFound(page_id.to_string()))?;
        let Some(blocks) = step(history).map(<[Block]>::to_vec) else {
            return Ok(false);
        };
        if let Some(page) = self.pages.get_mut(page_id) {
            page.blocks = blocks;
        }
        Ok(true)
    }

    fn insert_page(&mut self, page: Page, position: usize) {
        let id = page.id.clone();
        self.histories
            .insert(id.clone(), BlockHistory::new(page.blocks.clone()));
        self.pages.insert(id.clone(), page);
        let position = position.min(self.page_order.len());
        self.page_order.insert(position, id);
    }

    fn remove_page(&mut self, page_id: &str) -> Option<(Page, BlockHistory)> {
        self.page_order.retain(|id| id != page_id);
        let page = self.pages.remove(page_id)?;
        let history = self
            .histories
            .remove(page_id)
            .unwrap_or_else(|| BlockHistory::new(page.blocks.clone()));
        Some((page, history))
    }

    async fn refresh_timestamps(&mut self, page_id: &str) {
        let found = self
            .backend
            .select(Collection::Pages, &Filter::new().eq("id", page_id), None)
            .await;
        match found.and_then(records::from_records::<PageRecord>) {
            Ok(records) => {
                if let Some(record) = records.into_iter().next() {
                    self.apply_timestamps(page_id, record.created_at, record.updated_at);
                }
            }
            Err(err) => tracing::warn!(page_id, error = %err, "failed to refresh page timestamps"),
        }
    }

    fn apply_timestamps(&mut self, page_id: &str, created_at: Option<String>, updated_at: Option<String>) {
        if let Some(page) = self.pages.get_mut(page_id) {
            page.created_at = created_at.or(page.created_at.take());
            page.updated_at = updated_at.or(page.updated_at.take());
        }
    }

    async fn require_user(&self) -> StoreResult<String> {
        self.backend
            .current_user()
            .await?
            .ok_or(StoreError::Unauthenticated)
    }

    fn page_ref(&self, page_id: &str) -> StoreResult<&Page> {
        self.pages
            .get(page_id)
            .ok_or_else(|| StoreError::PageNotFound(page_id.to_string()))
    }

    fn page_mut(&mut self, page_id: &str) -> StoreResult<&mut Page> {
        self.pages
            .get_mut(page_id)
            .ok_or_else(|| StoreError::PageNotFound(page_id.to_string()))
    }

    fn finish<T>(&mut self, operation: &'static str, result: StoreResult<T>) -> StoreResult<T> {
        match result {
            Ok(value) => {
                self.error = None;
                Ok(value)
            }
            Err(err) => {
                tracing::warn!(operation, error = %err, "page operation failed");
                self.error = Some(err.to_string());
                Err(err)
            }
        }
    }
}

fn block_position(page: &Page, block_id: &str) -> StoreResult<usize> {
    page.block_index(block_id)
        .ok_or_else(|| block_not_found(&page.id, block_id))
}

fn block_not_found(page_id: &str, block_id: &str) -> StoreError {
    StoreError::BlockNotFound {
        page_id: page_id.to_string(),
        block_id: block_id.to_string(),
    }
}

fn page_record(user_id: &str, page: &Page) -> StoreResult<PageRecord> {
    Ok(PageRecord {
        id: page.id.clone(),
        user_id: user_id.to_string(),
        title: page.name.clone(),
        slug: page.slug.clone(),
        is_published: page.is_published,
        content: serde_json::to_value(&page.blocks).map_err(crate::io::backend::BackendError::from)?,
        created_at: page.created_at.clone(),
        updated_at: page.updated_at.clone(),
    })
}

fn blocks_from_content(page_id: &str, content: Value) -> Vec<Block> {
    match serde_json::from_value::<Vec<Block>>(content) {
        Ok(blocks) if !blocks.is_empty() => blocks,
        Ok(_) => {
            tracing::warn!(page_id, "page has no blocks; starting with an empty text block");
            vec![Block::text()]
        }
        Err(err) => {
            tracing::warn!(page_id, error = %err, "unreadable page content; starting with an empty text block");
            vec![Block::text()]
        }
    }
}
