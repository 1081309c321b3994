use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use super::allocator::ChestNumberAllocator;
use super::timed;
use crate::dto::department::CreateDepartmentRequest;
use crate::dto::participant::{CreateParticipantRequest, UpdateParticipantRequest};
use crate::error::{MeetError, Result, StorageError};
use crate::models::{Department, Participant};
use crate::repository::Store;

/// Registers departments and competitors. Chest numbers are drawn from the
/// allocator only after a registration has passed every check.
#[derive(Clone)]
pub struct RegistrationService {
    store: Arc<dyn Store>,
    allocator: ChestNumberAllocator,
    timeout: Duration,
}

impl RegistrationService {
    pub fn new(store: Arc<dyn Store>, allocator: ChestNumberAllocator, timeout: Duration) -> Self {
        Self {
            store,
            allocator,
            timeout,
        }
    }

    pub async fn create_department(&self, req: CreateDepartmentRequest) -> Result<Department> {
        req.validate()?;

        let department = Department {
            department_id: Uuid::new_v4(),
            name: req.name.trim().to_string(),
            code: req.code,
        };

        match timed(self.timeout, self.store.insert_department(&department)).await {
            Ok(()) => {}
            Err(StorageError::ConstraintViolation(_)) => {
                return Err(MeetError::Validation(format!(
                    "department code '{}' is already used",
                    department.code
                )));
            }
            Err(e) => return Err(e.into()),
        }

        info!(code = %department.code, "Created department");
        Ok(department)
    }

    pub async fn list_departments(&self) -> Result<Vec<Department>> {
        Ok(timed(self.timeout, self.store.list_departments()).await?)
    }

    pub async fn get_department(&self, department_id: Uuid) -> Result<Department> {
        timed(self.timeout, self.store.get_department(department_id))
            .await?
            .ok_or_else(|| MeetError::NotFound(format!("Department {}", department_id)))
    }

    pub async fn register_participant(&self, req: CreateParticipantRequest) -> Result<Participant> {
        req.validate()?;
        self.ensure_department(req.department_id).await?;

        let registration_code = req.registration_code.trim().to_string();
        if let Some(existing) = timed(
            self.timeout,
            self.store.find_participant_by_code(&registration_code),
        )
        .await?
        {
            return Err(duplicate(existing));
        }

        let chest_number = self.allocator.allocate().await?;

        let participant = Participant {
            participant_id: Uuid::new_v4(),
            name: req.name.trim().to_string(),
            registration_code,
            department_id: req.department_id,
            cohort: req.cohort.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()),
            semester: req.semester,
            gender: req.gender,
            chest_number,
            created_at: Utc::now().naive_utc(),
        };

        match timed(self.timeout, self.store.insert_participant(&participant)).await {
            Ok(()) => {}
            Err(StorageError::ConstraintViolation(reason)) => {
                // Lost a race with a concurrent registration of the same code.
                warn!(
                    chest_number = %chest_number,
                    reason = %reason,
                    "Registration rejected after chest number was issued"
                );
                let existing = timed(
                    self.timeout,
                    self.store
                        .find_participant_by_code(&participant.registration_code),
                )
                .await?;
                return Err(match existing {
                    Some(existing) => duplicate(existing),
                    None => StorageError::ConstraintViolation(reason).into(),
                });
            }
            Err(e) => return Err(e.into()),
        }

        info!(
            participant_id = %participant.participant_id,
            chest_number = %participant.chest_number,
            "Registered participant"
        );
        Ok(participant)
    }

    /// Updates biographical fields. The chest number and registration code never change.
    pub async fn update_participant(
        &self,
        participant_id: Uuid,
        req: UpdateParticipantRequest,
    ) -> Result<Participant> {
        req.validate()?;
        let mut participant = self.get_participant(participant_id).await?;

        if let Some(department_id) = req.department_id {
            self.ensure_department(department_id).await?;
            participant.department_id = department_id;
        }
        if let Some(name) = req.name {
            participant.name = name.trim().to_string();
        }
        if let Some(cohort) = req.cohort {
            let cohort = cohort.trim().to_string();
            participant.cohort = (!cohort.is_empty()).then_some(cohort);
        }
        if let Some(semester) = req.semester {
            participant.semester = Some(semester);
        }
        if let Some(gender) = req.gender {
            participant.gender = gender;
        }

        timed(self.timeout, self.store.update_participant(&participant)).await?;
        Ok(participant)
    }

    pub async fn get_participant(&self, participant_id: Uuid) -> Result<Participant> {
        timed(self.timeout, self.store.get_participant(participant_id))
            .await?
            .ok_or_else(|| MeetError::NotFound(format!("Participant {}", participant_id)))
    }

    pub async fn list_participants(&self) -> Result<Vec<Participant>> {
        Ok(timed(self.timeout, self.store.list_participants()).await?)
    }

    async fn ensure_department(&self, department_id: Uuid) -> Result<()> {
        match timed(self.timeout, self.store.get_department(department_id)).await? {
            Some(_) => Ok(()),
            None => Err(MeetError::Validation(format!(
                "department {} does not exist",
                department_id
            ))),
        }
    }
}

fn duplicate(existing: Participant) -> MeetError {
    MeetError::DuplicateRegistration {
        registration_code: existing.registration_code,
        participant_id: existing.participant_id,
        chest_number: existing.chest_number,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::models::{ChestNumber, Gender};
    use crate::repository::{CounterStore, InMemoryStore};

    fn service(store: InMemoryStore) -> RegistrationService {
        let config = EngineConfig::default();
        let shared = Arc::new(store);
        let counters: Arc<dyn CounterStore> = shared.clone();
        RegistrationService::new(
            shared,
            ChestNumberAllocator::new(counters, &config),
            config.store_timeout,
        )
    }

    async fn department(service: &RegistrationService) -> Department {
        service
            .create_department(CreateDepartmentRequest {
                name: "Mechanical Engineering".to_string(),
                code: "MECH".to_string(),
            })
            .await
            .unwrap()
    }

    fn request(department_id: Uuid, code: &str) -> CreateParticipantRequest {
        CreateParticipantRequest {
            name: "  Meera Iyer ".to_string(),
            registration_code: code.to_string(),
            department_id,
            cohort: Some("2023".to_string()),
            semester: Some(5),
            gender: Gender::Female,
        }
    }

    #[tokio::test]
    async fn test_register_issues_sequential_chest_numbers() {
        let service = service(InMemoryStore::new());
        let dept = department(&service).await;

        let first = service
            .register_participant(request(dept.department_id, "23ME001"))
            .await
            .unwrap();
        let second = service
            .register_participant(request(dept.department_id, "23ME002"))
            .await
            .unwrap();

        assert_eq!(first.name, "Meera Iyer");
        assert_eq!(first.chest_number, ChestNumber(101));
        assert_eq!(second.chest_number, ChestNumber(102));
    }

    #[tokio::test]
    async fn test_duplicate_code_names_existing_record() {
        let service = service(InMemoryStore::new());
        let dept = department(&service).await;
        let first = service
            .register_participant(request(dept.department_id, "23ME001"))
            .await
            .unwrap();

        let result = service
            .register_participant(request(dept.department_id, "23ME001"))
            .await;

        match result {
            Err(MeetError::DuplicateRegistration {
                participant_id,
                chest_number,
                ..
            }) => {
                assert_eq!(participant_id, first.participant_id);
                assert_eq!(chest_number, first.chest_number);
            }
            other => panic!("expected duplicate registration, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_request_does_not_consume_a_number() {
        let service = service(InMemoryStore::new());
        let dept = department(&service).await;

        let result = service
            .register_participant(request(dept.department_id, "bad code"))
            .await;
        assert!(matches!(result, Err(MeetError::Validation(_))));

        let ok = service
            .register_participant(request(dept.department_id, "23ME003"))
            .await
            .unwrap();
        assert_eq!(ok.chest_number, ChestNumber(101));
    }

    #[tokio::test]
    async fn test_unknown_department_rejected() {
        let service = service(InMemoryStore::new());
        let result = service
            .register_participant(request(Uuid::new_v4(), "23ME001"))
            .await;
        assert!(matches!(result, Err(MeetError::Validation(_))));
    }

    #[tokio::test]
    async fn test_duplicate_department_code() {
        let service = service(InMemoryStore::new());
        department(&service).await;

        let result = service
            .create_department(CreateDepartmentRequest {
                name: "Mechanical (evening)".to_string(),
                code: "MECH".to_string(),
            })
            .await;
        assert!(matches!(result, Err(MeetError::Validation(_))));
    }

    #[tokio::test]
    async fn test_update_keeps_chest_number() {
        let service = service(InMemoryStore::new());
        let dept = department(&service).await;
        let participant = service
            .register_participant(request(dept.department_id, "23ME001"))
            .await
            .unwrap();

        let updated = service
            .update_participant(
                participant.participant_id,
                UpdateParticipantRequest {
                    name: Some("Meera S. Iyer".to_string()),
                    semester: Some(6),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Meera S. Iyer");
        assert_eq!(updated.semester, Some(6));
        assert_eq!(updated.chest_number, participant.chest_number);
        assert_eq!(updated.registration_code, "23ME001");
    }
}
