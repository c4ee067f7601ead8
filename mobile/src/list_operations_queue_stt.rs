use crate::package_list::{ListKey, PackageList};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListOperation {
    Add { list: ListKey, package_name: String },
    Remove { list: ListKey, package_name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationStatus {
    Pending,
    Processing,
    Success(PackageList), // list as written
    Error(String),
}

/// Serializes list edits on one worker thread so two edits never interleave
/// their read-modify-write cycles.
pub struct ListOperationsQueue {
    pub queue: Arc<Mutex<VecDeque<ListOperation>>>,
    pub results: Arc<Mutex<HashMap<String, OperationStatus>>>,
    pub is_running: Arc<Mutex<bool>>,
    pub progress: Arc<Mutex<Option<f32>>>,
    pub cancelled: Arc<Mutex<bool>>,
}
