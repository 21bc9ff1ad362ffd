pub mod key_lister;
pub mod storage_service;
