// security/src/context.rs
//
// The access-scoping layer. One `CallerContext` is resolved per request by
// the HTTP auth middleware and passed by parameter into every core service,
// so authorization never depends on ambient request state.

use models::{ClinicError, ClinicResult};

use crate::roles::{Permission, Role, RolesConfig};

/// Everything a core operation needs to know about its caller.
#[derive(Debug, Clone)]
pub struct CallerContext {
    pub user_id: i64,
    pub role: Role,
    pub permissions: Vec<Permission>,
    /// Patient record linked to this account, when one exists.
    pub patient_id: Option<i64>,
    /// Nurse profile linked to this account, when one exists.
    pub nurse_id: Option<i64>,
}

impl CallerContext {
    pub fn new(user_id: i64, role: Role, roles_config: &RolesConfig) -> Self {
        CallerContext {
            user_id,
            role,
            permissions: roles_config.permissions_for(role.id()),
            patient_id: None,
            nurse_id: None,
        }
    }

    pub fn with_patient(mut self, patient_id: Option<i64>) -> Self {
        self.patient_id = patient_id;
        self
    }

    pub fn with_nurse(mut self, nurse_id: Option<i64>) -> Self {
        self.nurse_id = nurse_id;
        self
    }

    pub fn has(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
            || self.permissions.contains(&Permission::Superuser)
    }

    /// Static permission gate. `Forbidden` carries the permission name so
    /// operators can see what the role was missing.
    pub fn require(&self, permission: Permission) -> ClinicResult<()> {
        if self.has(permission) {
            Ok(())
        } else {
            Err(ClinicError::Forbidden(format!(
                "missing permission {}",
                permission
            )))
        }
    }

    /// For patient-role callers, the patient id every query must be
    /// constrained to. Accounts without a linked patient record fail closed.
    pub fn own_patient_id(&self) -> ClinicResult<i64> {
        debug_assert_eq!(self.role, Role::Patient);
        self.patient_id
            .ok_or_else(|| ClinicError::Forbidden("no patient record linked to account".to_string()))
    }

    /// Narrows an explicit patient filter: patient-role callers always get
    /// their own id regardless of what they asked for, everyone else keeps
    /// the requested filter.
    pub fn scope_patient_filter(&self, requested: Option<i64>) -> ClinicResult<Option<i64>> {
        if self.role == Role::Patient {
            Ok(Some(self.own_patient_id()?))
        } else {
            Ok(requested)
        }
    }

    /// Row-level ownership check for single-record reads. Fails with
    /// `Forbidden` rather than `NotFound` so existence is not leaked.
    pub fn ensure_patient_access(&self, row_patient_id: i64) -> ClinicResult<()> {
        if self.role != Role::Patient {
            return Ok(());
        }
        if self.own_patient_id()? == row_patient_id {
            Ok(())
        } else {
            Err(ClinicError::Forbidden(
                "record belongs to another patient".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles() -> RolesConfig {
        RolesConfig::from_yaml_str(
            r#"
roles:
  admin:
    id: 1
    permissions: [superuser]
  nurse:
    id: 3
    permissions: [hd_session:read, hd_session:create]
  patient:
    id: 4
    permissions: [hd_session:read]
"#,
        )
        .unwrap()
    }

    #[test]
    fn require_honors_role_permissions() {
        let config = roles();
        let nurse = CallerContext::new(10, Role::Nurse, &config);
        assert!(nurse.require(Permission::HdSessionCreate).is_ok());
        assert!(nurse.require(Permission::HdSessionDelete).is_err());

        let admin = CallerContext::new(1, Role::Admin, &config);
        assert!(admin.require(Permission::HdSessionDelete).is_ok());
    }

    #[test]
    fn patient_filter_is_forced_to_own_record() {
        let config = roles();
        let patient = CallerContext::new(20, Role::Patient, &config).with_patient(Some(7));
        assert_eq!(patient.scope_patient_filter(Some(99)).unwrap(), Some(7));

        let nurse = CallerContext::new(10, Role::Nurse, &config);
        assert_eq!(nurse.scope_patient_filter(Some(99)).unwrap(), Some(99));
    }

    #[test]
    fn unlinked_patient_account_fails_closed() {
        let config = roles();
        let patient = CallerContext::new(20, Role::Patient, &config);
        assert!(matches!(
            patient.scope_patient_filter(None),
            Err(ClinicError::Forbidden(_))
        ));
        assert!(patient.ensure_patient_access(7).is_err());
    }

    #[test]
    fn cross_patient_read_is_forbidden_not_missing() {
        let config = roles();
        let patient = CallerContext::new(20, Role::Patient, &config).with_patient(Some(7));
        assert!(patient.ensure_patient_access(7).is_ok());
        let err = patient.ensure_patient_access(8).unwrap_err();
        assert!(matches!(err, ClinicError::Forbidden(_)));
    }
}
