use tracing::{debug, info, warn};

use super::domain::{
    Application, ApplicationDraft, ApplicationId, ApplicationStatus, EventSchedule, FieldUpdate,
    OwnerId, NOT_PROVIDED,
};
use super::repository::{
    ApplicationFields, ApplicationRepository, NewApplication, RowChange, RowKey,
};
use super::service::{ApplicationError, ApplicationService};

impl<R> ApplicationService<R>
where
    R: ApplicationRepository + 'static,
{
    /// Record a new application for `owner`. The status always starts at `submitted` and
    /// the apply date defaults to now.
    pub fn create(
        &self,
        owner: OwnerId,
        draft: ApplicationDraft,
    ) -> Result<Application, ApplicationError> {
        let company = required("company", draft.company)?;
        let position = required("position", draft.position)?;
        let now = self.clock.now();

        let row = NewApplication {
            owner_id: owner,
            company,
            position,
            status: ApplicationStatus::Submitted,
            apply_date: draft.apply_date.unwrap_or(now),
            next_event: draft.next_event,
            event_type: optional(draft.event_type),
            event_link: optional(draft.event_link),
            location: or_placeholder(draft.location),
            salary: or_placeholder(draft.salary),
            contact_info: or_placeholder(draft.contact_info),
            notes: or_placeholder(draft.notes),
            recorded_at: now,
        };

        let application = self.repository.insert(row)?;
        info!(
            application_id = %application.id,
            owner_id = %owner,
            "application created"
        );
        Ok(application)
    }

    /// Overwrite the editable columns of an application the caller owns.
    pub fn update_fields(
        &self,
        id: ApplicationId,
        owner: OwnerId,
        update: FieldUpdate,
    ) -> Result<(), ApplicationError> {
        let fields = ApplicationFields {
            company: required("company", update.company)?,
            position: required("position", update.position)?,
            event_link: optional(update.event_link),
            location: or_placeholder(update.location),
            salary: or_placeholder(update.salary),
            contact_info: or_placeholder(update.contact_info),
            notes: or_placeholder(update.notes),
        };

        let touched = self.repository.update(
            RowKey::Owned { id, owner },
            RowChange::Fields(fields),
            self.clock.now(),
        )?;
        if touched == 0 {
            warn!(application_id = %id, owner_id = %owner, "update matched no owned application");
            return Err(ApplicationError::NotFoundOrForbidden(id));
        }

        info!(application_id = %id, owner_id = %owner, "application fields updated");
        Ok(())
    }

    /// Overwrite the status of any application by id.
    ///
    /// This path is not owner-scoped: any authenticated caller can change the status of an
    /// application whose id they know. Labels outside the known set are stored verbatim.
    pub fn set_status(
        &self,
        id: ApplicationId,
        status: ApplicationStatus,
    ) -> Result<(), ApplicationError> {
        let label = status.label().to_string();
        let touched =
            self.repository
                .update(RowKey::Id(id), RowChange::Status(status), self.clock.now())?;
        if touched == 0 {
            return Err(ApplicationError::NotFound(id));
        }

        info!(application_id = %id, status = %label, "application status changed");
        Ok(())
    }

    /// Replace the next-event time, type, and link together. Past times are accepted, and a
    /// missing time clears the event. Not owner-scoped, like [`Self::set_status`].
    pub fn schedule_event(
        &self,
        id: ApplicationId,
        schedule: EventSchedule,
    ) -> Result<(), ApplicationError> {
        let schedule = EventSchedule {
            next_event: schedule.next_event,
            event_type: optional(schedule.event_type),
            event_link: optional(schedule.event_link),
        };
        let next_event = schedule.next_event;

        let touched =
            self.repository
                .update(RowKey::Id(id), RowChange::Event(schedule), self.clock.now())?;
        if touched == 0 {
            return Err(ApplicationError::NotFound(id));
        }

        info!(application_id = %id, ?next_event, "application event scheduled");
        Ok(())
    }

    /// Soft-delete an application the caller owns.
    ///
    /// Ownership is checked first and the delete is issued by id afterwards. If another
    /// request deletes the row in between, the outcome is the same and this call succeeds.
    pub fn delete(&self, id: ApplicationId, owner: OwnerId) -> Result<(), ApplicationError> {
        if self
            .repository
            .find(RowKey::Owned { id, owner })?
            .is_none()
        {
            warn!(application_id = %id, owner_id = %owner, "delete matched no owned application");
            return Err(ApplicationError::NotFoundOrForbidden(id));
        }

        let touched = self.repository.soft_delete(RowKey::Id(id), self.clock.now())?;
        if touched == 0 {
            debug!(application_id = %id, "application already deleted concurrently");
        }

        info!(application_id = %id, owner_id = %owner, "application deleted");
        Ok(())
    }
}

fn required(field: &'static str, value: String) -> Result<String, ApplicationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApplicationError::Validation { field });
    }
    Ok(trimmed.to_string())
}

fn or_placeholder(value: Option<String>) -> String {
    optional(value).unwrap_or_else(|| NOT_PROVIDED.to_string())
}

fn optional(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}
