pub mod category;
pub mod record;

pub use category::{class_key, Category, CategoryCatalog, Selection, UnknownCategoryPolicy};
pub use record::Record;
