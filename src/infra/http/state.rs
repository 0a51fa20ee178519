use std::sync::Arc;

use crate::application::archive::ArchiveService;
use crate::application::reports::ReportService;

#[derive(Clone)]
pub struct HttpState {
    pub reports: Arc<ReportService>,
    pub archive: Arc<ArchiveService>,
}

impl HttpState {
    pub fn new(reports: Arc<ReportService>) -> Self {
        let archive = reports.archive().clone();
        Self { reports, archive }
    }
}
