use serde::{Deserialize, Serialize};

/// A garage-sale listing row as stored in the managed backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GarageSaleListing {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub description: String,
    pub community: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sale_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListListingsQuery {
    pub community: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateListingRequest {
    pub title: String,
    pub description: String,
    pub community: String,
    pub category: String,
    pub address: Option<String>,
    pub sale_date: Option<String>,
}

impl CreateListingRequest {
    /// Field-level checks only; anything deeper is enforced by the
    /// backend's row policies.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.title.trim().is_empty() {
            return Err("Listing title must not be empty");
        }
        if self.title.chars().count() > 120 {
            return Err("Listing title must be at most 120 characters");
        }
        if self.community.trim().is_empty() {
            return Err("Community must not be empty");
        }
        if self.category.trim().is_empty() {
            return Err("Category must not be empty");
        }
        Ok(())
    }

    pub fn into_row(self) -> GarageSaleListing {
        GarageSaleListing {
            id: None,
            title: self.title.trim().to_string(),
            description: self.description,
            community: self.community,
            category: self.category,
            address: self.address,
            sale_date: self.sale_date,
            created_at: None,
        }
    }
}
