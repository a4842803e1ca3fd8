mod base;
mod block_bloom_filter;
mod bulk_bloom_filter;
mod multi_hash_bloom_filter;
pub mod signature;

pub use self::base::{Filter, FilterCore};
pub use self::block_bloom_filter::BlockBloomFilter;
pub use self::bulk_bloom_filter::BulkBloomFilter;
pub use self::multi_hash_bloom_filter::MultiHashBloomFilter;
