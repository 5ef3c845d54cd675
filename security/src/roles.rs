// security/src/roles.rs

use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use anyhow::Result;

/// The closed authorization vocabulary. Permission names are parsed from the
/// roles file once at startup; an unknown name fails configuration loading
/// instead of silently never matching at a call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum Permission {
    #[serde(rename = "patient_schedule:read")]
    PatientScheduleRead,
    #[serde(rename = "patient_schedule:create")]
    PatientScheduleCreate,
    #[serde(rename = "patient_schedule:update")]
    PatientScheduleUpdate,
    #[serde(rename = "patient_schedule:delete")]
    PatientScheduleDelete,
    #[serde(rename = "nurse_schedule:read")]
    NurseScheduleRead,
    #[serde(rename = "nurse_schedule:create")]
    NurseScheduleCreate,
    #[serde(rename = "nurse_schedule:update")]
    NurseScheduleUpdate,
    #[serde(rename = "nurse_schedule:delete")]
    NurseScheduleDelete,
    #[serde(rename = "hd_session:read")]
    HdSessionRead,
    #[serde(rename = "hd_session:create")]
    HdSessionCreate,
    #[serde(rename = "hd_session:update")]
    HdSessionUpdate,
    #[serde(rename = "hd_session:delete")]
    HdSessionDelete,
    #[serde(rename = "hd_session:complete")]
    HdSessionComplete,
    #[serde(rename = "clinical_event:read")]
    ClinicalEventRead,
    #[serde(rename = "clinical_event:write")]
    ClinicalEventWrite,
    #[serde(rename = "calendar:sync")]
    CalendarSync,
    #[serde(rename = "superuser")]
    Superuser,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Permission::PatientScheduleRead => "patient_schedule:read",
            Permission::PatientScheduleCreate => "patient_schedule:create",
            Permission::PatientScheduleUpdate => "patient_schedule:update",
            Permission::PatientScheduleDelete => "patient_schedule:delete",
            Permission::NurseScheduleRead => "nurse_schedule:read",
            Permission::NurseScheduleCreate => "nurse_schedule:create",
            Permission::NurseScheduleUpdate => "nurse_schedule:update",
            Permission::NurseScheduleDelete => "nurse_schedule:delete",
            Permission::HdSessionRead => "hd_session:read",
            Permission::HdSessionCreate => "hd_session:create",
            Permission::HdSessionUpdate => "hd_session:update",
            Permission::HdSessionDelete => "hd_session:delete",
            Permission::HdSessionComplete => "hd_session:complete",
            Permission::ClinicalEventRead => "clinical_event:read",
            Permission::ClinicalEventWrite => "clinical_event:write",
            Permission::CalendarSync => "calendar:sync",
            Permission::Superuser => "superuser",
        };
        write!(f, "{}", s)
    }
}

/// Caller roles known to the clinic. Role ids match the roles file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Doctor,
    Nurse,
    Patient,
}

impl Role {
    pub fn from_id(id: u32) -> Option<Role> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::Doctor),
            3 => Some(Role::Nurse),
            4 => Some(Role::Patient),
            _ => None,
        }
    }

    pub fn id(&self) -> u32 {
        match self {
            Role::Admin => 1,
            Role::Doctor => 2,
            Role::Nurse => 3,
            Role::Patient => 4,
        }
    }

    /// Roles allowed to author a clinical session.
    pub fn can_record_sessions(&self) -> bool {
        matches!(self, Role::Admin | Role::Nurse)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RoleConfig {
    pub id: u32,
    pub permissions: Vec<Permission>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RolesConfig {
    pub roles: HashMap<String, RoleConfig>,
    #[serde(skip)]
    role_id_map: HashMap<u32, RoleConfig>,
}

impl RolesConfig {
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let mut config: RolesConfig = serde_yaml::from_str(content)?;
        config.role_id_map = config
            .roles
            .values()
            .map(|role_cfg| (role_cfg.id, role_cfg.clone()))
            .collect();
        Ok(config)
    }

    pub fn get_role_config_by_id(&self, role_id: u32) -> Option<&RoleConfig> {
        self.role_id_map.get(&role_id)
    }

    pub fn permissions_for(&self, role_id: u32) -> Vec<Permission> {
        self.get_role_config_by_id(role_id)
            .map(|cfg| cfg.permissions.clone())
            .unwrap_or_default()
    }

    pub fn has_permission(&self, role_id: u32, permission: Permission) -> bool {
        self.get_role_config_by_id(role_id).is_some_and(|role_cfg| {
            role_cfg.permissions.contains(&permission)
                || role_cfg.permissions.contains(&Permission::Superuser)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROLES_YAML: &str = r#"
roles:
  admin:
    id: 1
    permissions: [superuser]
  nurse:
    id: 3
    permissions:
      - patient_schedule:read
      - patient_schedule:create
      - hd_session:read
      - hd_session:create
      - hd_session:complete
      - clinical_event:read
      - clinical_event:write
  patient:
    id: 4
    permissions: [hd_session:read, patient_schedule:read]
"#;

    #[test]
    fn parses_roles_and_resolves_by_id() {
        let config = RolesConfig::from_yaml_str(ROLES_YAML).unwrap();
        assert!(config.has_permission(3, Permission::HdSessionCreate));
        assert!(!config.has_permission(3, Permission::HdSessionDelete));
        assert!(!config.has_permission(4, Permission::HdSessionCreate));
        assert!(config.get_role_config_by_id(99).is_none());
    }

    #[test]
    fn superuser_carries_every_permission() {
        let config = RolesConfig::from_yaml_str(ROLES_YAML).unwrap();
        assert!(config.has_permission(1, Permission::HdSessionDelete));
        assert!(config.has_permission(1, Permission::CalendarSync));
    }

    #[test]
    fn unknown_permission_name_fails_loading() {
        let yaml = "roles:\n  admin:\n    id: 1\n    permissions: [frobnicate]\n";
        assert!(RolesConfig::from_yaml_str(yaml).is_err());
    }
}
