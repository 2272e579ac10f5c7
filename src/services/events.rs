use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::auth::Identity;
use crate::db::Store;
use crate::models::{Event, EventSummary, NewEvent, SeedOutcome};
use crate::utils::error::AppError;

const SAMPLE_WORKSHOP_TITLE: &str = "STEM Robotics Workshop - Build Your First Robot!";
const SAMPLE_VIEWING_PARTY_TITLE: &str = "FTC Championship Viewing Party";

/// Read model of upcoming events plus the admin-side event authoring.
#[derive(Clone)]
pub struct EventDirectory {
    store: Arc<dyn Store>,
}

/// Result of seeding the demo events.
#[derive(Debug)]
pub struct SampleEvents {
    pub created: bool,
    pub events: Vec<Event>,
}

impl EventDirectory {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list_upcoming_events(
        &self,
        viewer_id: Option<Uuid>,
    ) -> Result<Vec<EventSummary>, AppError> {
        self.store.list_event_summaries(Utc::now(), viewer_id).await
    }

    pub async fn create_event(&self, identity: &Identity, event: NewEvent) -> Result<Event, AppError> {
        identity.require_admin()?;
        let event = validate_new_event(event)?;

        let created = self.store.insert_event(&event, Some(identity.user_id)).await?;
        tracing::info!(event_id = %created.id, title = %created.title, "Event created");
        Ok(created)
    }

    /// Creates the two demo events unless the workshop already exists.
    pub async fn seed_sample_events(&self, identity: &Identity) -> Result<SampleEvents, AppError> {
        identity.require_admin()?;

        let now = Utc::now();
        let workshop = NewEvent {
            title: SAMPLE_WORKSHOP_TITLE.to_string(),
            description: "A hands-on robotics workshop covering the basics of programming and \
                          building robots with LEGO Mindstorms EV3. All materials provided."
                .to_string(),
            date: now + Duration::weeks(2),
            location: "Alphabots4All STEM Lab, 123 Innovation Drive, Fremont, CA".to_string(),
            price: Decimal::new(2500, 2),
            max_attendees: Some(20),
            image: Some("🤖".to_string()),
        };
        let viewing_party = NewEvent {
            title: SAMPLE_VIEWING_PARTY_TITLE.to_string(),
            description: "Watch the FIRST Tech Challenge World Championship live stream with \
                          the team, with snacks and strategy talk."
                .to_string(),
            date: now + Duration::weeks(3),
            location: "Community Center, 456 Tech Boulevard, Fremont, CA".to_string(),
            price: Decimal::ZERO,
            max_attendees: Some(50),
            image: Some("🏆".to_string()),
        };

        match self
            .store
            .seed_events(SAMPLE_WORKSHOP_TITLE, &[workshop, viewing_party])
            .await?
        {
            SeedOutcome::Created(events) => {
                tracing::info!(count = events.len(), "Sample events created");
                Ok(SampleEvents {
                    created: true,
                    events,
                })
            }
            SeedOutcome::Existing(existing) => Ok(SampleEvents {
                created: false,
                events: vec![existing],
            }),
        }
    }
}

fn validate_new_event(mut event: NewEvent) -> Result<NewEvent, AppError> {
    event.title = event.title.trim().to_string();
    event.description = event.description.trim().to_string();
    event.location = event.location.trim().to_string();

    if event.title.is_empty() || event.description.is_empty() || event.location.is_empty() {
        return Err(AppError::ValidationError(
            "Title, description, date, and location are required".to_string(),
        ));
    }
    if event.price < Decimal::ZERO {
        return Err(AppError::ValidationError("Price cannot be negative".to_string()));
    }
    if matches!(event.max_attendees, Some(max) if max <= 0) {
        return Err(AppError::ValidationError(
            "maxAttendees must be a positive number".to_string(),
        ));
    }
    event.image = event.image.filter(|image| !image.trim().is_empty());

    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryStore;
    use crate::models::Role;

    fn admin() -> Identity {
        Identity {
            user_id: Uuid::new_v4(),
            role: Role::Admin,
        }
    }

    fn draft() -> NewEvent {
        NewEvent {
            title: "  Spring Build Night ".to_string(),
            description: "Open lab".to_string(),
            date: Utc::now() + Duration::days(5),
            location: "STEM Lab".to_string(),
            price: Decimal::ZERO,
            max_attendees: None,
            image: Some("  ".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_event_requires_admin() {
        let directory = EventDirectory::new(Arc::new(InMemoryStore::new()));
        let member = Identity {
            user_id: Uuid::new_v4(),
            role: Role::User,
        };
        let err = directory.create_event(&member, draft()).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_create_event_normalizes_fields() {
        let directory = EventDirectory::new(Arc::new(InMemoryStore::new()));
        let admin = admin();
        let event = directory.create_event(&admin, draft()).await.unwrap();
        assert_eq!(event.title, "Spring Build Night");
        assert_eq!(event.created_by, Some(admin.user_id));
        assert!(event.image.is_none());
    }

    #[tokio::test]
    async fn test_create_event_rejects_invalid_input() {
        let directory = EventDirectory::new(Arc::new(InMemoryStore::new()));

        let mut blank = draft();
        blank.location = "   ".to_string();
        assert!(matches!(
            directory.create_event(&admin(), blank).await,
            Err(AppError::ValidationError(_))
        ));

        let mut negative = draft();
        negative.price = Decimal::new(-500, 2);
        assert!(matches!(
            directory.create_event(&admin(), negative).await,
            Err(AppError::ValidationError(_))
        ));

        let mut no_room = draft();
        no_room.max_attendees = Some(0);
        assert!(matches!(
            directory.create_event(&admin(), no_room).await,
            Err(AppError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_seed_sample_events_is_idempotent() {
        let directory = EventDirectory::new(Arc::new(InMemoryStore::new()));
        let admin = admin();

        let first = directory.seed_sample_events(&admin).await.unwrap();
        assert!(first.created);
        assert_eq!(first.events.len(), 2);
        assert!(first.events.iter().any(|e| e.is_free()));

        let second = directory.seed_sample_events(&admin).await.unwrap();
        assert!(!second.created);
        assert_eq!(second.events[0].id, first.events[0].id);

        let upcoming = directory.list_upcoming_events(None).await.unwrap();
        assert_eq!(upcoming.len(), 2);
        assert_eq!(upcoming[0].event.title, SAMPLE_WORKSHOP_TITLE);
    }

    #[tokio::test]
    async fn test_concurrent_seeding_creates_one_set() {
        let directory = EventDirectory::new(Arc::new(InMemoryStore::new()));
        let admin = admin();

        let (a, b) = tokio::join!(
            directory.seed_sample_events(&admin),
            directory.seed_sample_events(&admin)
        );
        let (a, b) = (a.unwrap(), b.unwrap());
        assert!(a.created ^ b.created);

        let upcoming = directory.list_upcoming_events(None).await.unwrap();
        assert_eq!(upcoming.len(), 2);
    }
}
