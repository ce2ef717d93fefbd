pub mod extractor;
pub mod fetcher;

pub use extractor::CssExtractor;
pub use fetcher::ReqwestFetcher;
