//! Contact search

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{ActionError, ActionOutcome, PermissionStatus};
use crate::db::ContactRepo;

/// A directory entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub name: String,
    pub phone_numbers: Vec<String>,
}

/// A contact that can be called
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactMatch {
    pub name: String,
    pub phone_number: String,
}

/// A contacts directory the assistant may search
#[async_trait]
pub trait ContactsDirectory: Send + Sync {
    /// Ask for read access
    async fn request_permission(&self) -> PermissionStatus;

    /// Contacts whose name matches `name`
    async fn find_by_name(&self, name: &str) -> ActionOutcome<Vec<Contact>>;
}

/// Search contacts by name, keeping only those with a phone number
///
/// Each match reports the contact's first number. No match is an empty
/// list, not an error; deciding what to do with zero or several matches
/// is left to the caller.
///
/// # Errors
///
/// `PermissionDenied` if contacts access is not granted
pub async fn search_contacts(
    directory: &dyn ContactsDirectory,
    name: &str,
) -> ActionOutcome<Vec<ContactMatch>> {
    if !directory.request_permission().await.is_granted() {
        return Err(ActionError::permission_denied(
            "Contacts permission not granted",
        ));
    }

    let contacts = directory.find_by_name(name).await?;
    let total = contacts.len();

    let matches: Vec<ContactMatch> = contacts
        .into_iter()
        .filter_map(|contact| {
            let phone_number = contact.phone_numbers.into_iter().next()?;
            Some(ContactMatch {
                name: contact.name,
                phone_number,
            })
        })
        .collect();

    tracing::debug!(query = name, total, with_phone = matches.len(), "contacts searched");
    Ok(matches)
}

/// Contacts directory backed by the local database
#[derive(Clone)]
pub struct LocalContacts {
    repo: ContactRepo,
    access: PermissionStatus,
}

impl LocalContacts {
    #[must_use]
    pub const fn new(repo: ContactRepo, access: PermissionStatus) -> Self {
        Self { repo, access }
    }
}

#[async_trait]
impl ContactsDirectory for LocalContacts {
    async fn request_permission(&self) -> PermissionStatus {
        self.access
    }

    async fn find_by_name(&self, name: &str) -> ActionOutcome<Vec<Contact>> {
        let records = self
            .repo
            .find_by_name(name)
            .map_err(|e| ActionError::upstream(format!("contacts lookup failed: {e}")))?;

        Ok(records
            .into_iter()
            .map(|r| Contact {
                name: r.name,
                phone_numbers: r.phone_numbers,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ActionErrorKind;
    use crate::db::init_memory;

    fn local(access: PermissionStatus) -> (LocalContacts, ContactRepo) {
        let repo = ContactRepo::new(init_memory().unwrap());
        (LocalContacts::new(repo.clone(), access), repo)
    }

    #[tokio::test]
    async fn empty_directory_yields_empty_list() {
        let (contacts, _) = local(PermissionStatus::Granted);
        let matches = search_contacts(&contacts, "NoSuchPerson").await.unwrap();
        assert!(matches.is_empty());
    }

    #[tokio::test]
    async fn drops_contacts_without_numbers() {
        let (contacts, repo) = local(PermissionStatus::Granted);
        repo.add("John Smith", &["555-0100".to_string(), "555-0101".to_string()])
            .unwrap();
        repo.add("John Doe", &[]).unwrap();

        let matches = search_contacts(&contacts, "John").await.unwrap();
        assert_eq!(
            matches,
            vec![ContactMatch {
                name: "John Smith".to_string(),
                phone_number: "555-0100".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn denied_access_is_reported() {
        let (contacts, repo) = local(PermissionStatus::Denied);
        repo.add("John", &["1".to_string()]).unwrap();

        let err = search_contacts(&contacts, "John").await.unwrap_err();
        assert_eq!(err.kind, ActionErrorKind::PermissionDenied);
        assert_eq!(err.message, "Contacts permission not granted");
    }

    #[test]
    fn match_serializes_camel_case() {
        let json = serde_json::to_value(ContactMatch {
            name: "Ann".to_string(),
            phone_number: "1".to_string(),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"name": "Ann", "phoneNumber": "1"}));
    }
}
