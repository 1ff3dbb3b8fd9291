//! State modules of the application.

mod categories;

pub use categories::{Categories, CategoriesPatch, CategoriesState, Category, CategoryList, ParentRef};
