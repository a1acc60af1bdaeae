pub mod rates;
pub mod sheets;

pub use rates::HttpExchangeRateProvider;
pub use sheets::SheetsRecordStore;
