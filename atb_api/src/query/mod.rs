mod catalog;
pub use self::catalog::CatalogQuery;
