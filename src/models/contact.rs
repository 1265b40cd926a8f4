use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl ContactInfo {
    pub fn is_complete(&self) -> bool {
        self.name.is_some() && self.email.is_some()
    }
}
