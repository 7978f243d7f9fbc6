mod page;
pub use self::page::DiscountPage;
