use campus_core::CampusApp;

/// Router state: the app container, cheap to clone.
#[derive(Clone)]
pub struct CampusAxumState {
    pub app: CampusApp,
}

impl CampusAxumState {
    pub fn new(app: CampusApp) -> Self {
        Self { app }
    }
}
