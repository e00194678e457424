//! Approval composition: which roles must sign off a campaign, and whether
//! they all have.

use chrono::Utc;
use mailer_core::{CampaignCategory, Role};
use uuid::Uuid;

use crate::models::{Approval, ApprovalStatus};
use crate::policy::{DepartmentRule, OrgWideRule, PolicySettings};

pub struct ApprovalGate;

impl ApprovalGate {
    /// Roles that must approve a campaign of `category` under `settings`.
    ///
    /// EMERGENCY campaigns submitted without bypass go through the same
    /// single-approver path as GENERAL.
    pub fn required_steps(category: CampaignCategory, settings: &PolicySettings) -> Vec<Role> {
        match category {
            CampaignCategory::OrgWide => match settings.org_wide_rule {
                OrgWideRule::Approver => vec![Role::Approver],
                OrgWideRule::HrAdminAndApprover => vec![Role::HrAdmin, Role::Approver],
            },
            CampaignCategory::Departmental => match settings.department_rule {
                DepartmentRule::Approver => vec![Role::Approver],
                DepartmentRule::DeptAdmin => vec![Role::DeptAdmin],
            },
            CampaignCategory::General | CampaignCategory::Emergency => vec![Role::Approver],
        }
    }

    /// One pending row per required role.
    pub fn pending_rows(campaign_id: Uuid, roles: &[Role]) -> Vec<Approval> {
        let now = Utc::now();
        roles
            .iter()
            .map(|role| Approval {
                id: Uuid::new_v4(),
                campaign_id,
                role: *role,
                status: ApprovalStatus::Pending,
                decided_by: None,
                comment: None,
                created_at: now,
                decided_at: None,
            })
            .collect()
    }

    /// True when at least one row exists and every row has been approved.
    pub fn all_satisfied<'a>(rows: impl IntoIterator<Item = &'a Approval>) -> bool {
        let mut any = false;
        for row in rows {
            if row.status != ApprovalStatus::Approved {
                return false;
            }
            any = true;
        }
        any
    }
}
