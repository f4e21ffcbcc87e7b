pub mod blocks;
pub mod column_template;
pub mod column_type;
pub mod data_model;
pub mod database_store;
pub mod debounce;
pub mod error;
pub mod history;
pub mod page_store;
pub mod table_state;
pub mod view;
