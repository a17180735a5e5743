//! Supabase adapters - object storage for source and result images.

mod storage;

pub use storage::{SupabaseStorage, SupabaseStorageConfig};
