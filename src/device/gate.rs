use std::sync::Arc;

use anyhow::{anyhow, Result};
use tracing::{debug, info, warn};

use super::fingerprint::RequestFingerprint;
use super::policy::DeviceMatchPolicy;
use crate::{
    db::{ActiveDeviceWrite, DBLayer},
    model::{device::Device, user::User},
};

pub const RESET_REASON_DEFAULT: &str = "reset by administrator";
pub const LOGOUT_REASON_DEFAULT: &str = "logged out";
pub const SUPERSEDED_REASON: &str = "superseded by a newly registered device";

/// Outcome of running a login attempt through the device gate.
#[derive(Debug, Clone)]
pub enum LoginDecision {
    /// No device was active: this one is now the user's active device.
    Registered { device: Device },
    /// Recognised as the already active device.
    SameDevice { device: Device },
    /// Single-device login is off; the device is recorded but not gated.
    Tracked { device: Device, new_device: bool },
    /// Another device holds the session.
    Blocked { active: Device },
}

impl LoginDecision {
    pub fn allowed(&self) -> bool {
        !matches!(self, LoginDecision::Blocked { .. })
    }

    pub fn track_only(&self) -> bool {
        matches!(self, LoginDecision::Tracked { .. })
    }

    pub fn is_new_device(&self) -> bool {
        match self {
            LoginDecision::Registered { .. } => true,
            LoginDecision::Tracked { new_device, .. } => *new_device,
            LoginDecision::SameDevice { .. } | LoginDecision::Blocked { .. } => false,
        }
    }

    /// The device the session was granted on.
    pub fn device(&self) -> Option<&Device> {
        match self {
            LoginDecision::Registered { device }
            | LoginDecision::SameDevice { device }
            | LoginDecision::Tracked { device, .. } => Some(device),
            LoginDecision::Blocked { .. } => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            LoginDecision::Registered { .. } => "registered",
            LoginDecision::SameDevice { .. } => "same_device",
            LoginDecision::Tracked { .. } => "tracked",
            LoginDecision::Blocked { .. } => "blocked",
        }
    }
}

/// Single-device-login enforcement over the device rows in storage.
#[derive(Clone)]
pub struct DeviceGate {
    db: Arc<DBLayer>,
    policy: DeviceMatchPolicy,
}

impl DeviceGate {
    pub fn new(db: Arc<DBLayer>, policy: DeviceMatchPolicy) -> Self {
        Self { db, policy }
    }

    pub fn policy(&self) -> &DeviceMatchPolicy {
        &self.policy
    }

    /// Decide whether `user` may log in from `fp`. Credentials must already be verified.
    ///
    /// The decision and its write happen under the user's active-device lock, so
    /// concurrent first logins cannot both register.
    pub async fn check_login(&self, user: &User, fp: &RequestFingerprint) -> Result<LoginDecision> {
        let session_id = uuid::Uuid::new_v4().to_string();
        let enforced = user.single_device_login_enabled;

        let decision = self
            .db
            .update_active_device(&user.id, |active, devices| {
                if enforced {
                    self.enforce(user, fp, session_id, active)
                } else {
                    self.track(user, fp, session_id, devices)
                }
            })
            .await?;

        match &decision {
            LoginDecision::Blocked { active } => warn!(
                user_id = %user.id,
                device_id = %fp.device_id,
                active_device = %active.id,
                browser = %fp.traits.browser_family,
                platform = %fp.traits.platform,
                "login blocked by active device"
            ),
            other => info!(
                user_id = %user.id,
                device_id = %fp.device_id,
                outcome = other.label(),
                new_device = other.is_new_device(),
                "device check passed"
            ),
        }

        Ok(decision)
    }

    fn enforce(
        &self,
        user: &User,
        fp: &RequestFingerprint,
        session_id: String,
        active: Option<&Device>,
    ) -> (ActiveDeviceWrite, LoginDecision) {
        match active {
            None => {
                let mut device = Device::from_fingerprint(&user.id, fp);
                device.session_id = Some(session_id);
                (
                    ActiveDeviceWrite::Replace(device.clone(), SUPERSEDED_REASON),
                    LoginDecision::Registered { device },
                )
            }
            Some(active) if self.policy.is_same_device(active, fp) => {
                let mut device = active.clone();
                device.touch(fp);
                device.session_id = Some(session_id);
                (
                    ActiveDeviceWrite::Activate(device.clone()),
                    LoginDecision::SameDevice { device },
                )
            }
            Some(active) => (
                ActiveDeviceWrite::Keep,
                LoginDecision::Blocked {
                    active: active.clone(),
                },
            ),
        }
    }

    // Upsert the matching row, exact fingerprint first; no exclusivity.
    fn track(
        &self,
        user: &User,
        fp: &RequestFingerprint,
        session_id: String,
        devices: &[Device],
    ) -> (ActiveDeviceWrite, LoginDecision) {
        let existing = devices
            .iter()
            .find(|d| d.device_id == fp.device_id)
            .or_else(|| devices.iter().find(|d| self.policy.is_same_device(d, fp)));

        let (mut device, new_device) = match existing {
            Some(device) => {
                let mut device = device.clone();
                device.touch(fp);
                (device, false)
            }
            None => (Device::from_fingerprint(&user.id, fp), true),
        };
        device.session_id = Some(session_id);
        (
            ActiveDeviceWrite::Activate(device.clone()),
            LoginDecision::Tracked { device, new_device },
        )
    }

    /// Deactivate every active device; the next login registers a fresh device.
    pub async fn reset_devices(&self, user_id: &str, reason: Option<&str>) -> Result<(User, usize)> {
        let mut user = self
            .db
            .load_user(user_id)
            .await?
            .ok_or_else(|| anyhow!("user {user_id} not found"))?;
        let reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(RESET_REASON_DEFAULT);

        let count = self.db.deactivate_devices(user_id, None, reason).await?.len();

        user.devices_reset_ts = Some(chrono::Utc::now().timestamp());
        user.devices_reset_reason = Some(reason.to_string());
        self.db.save_user(&user).await?;

        info!(user_id, count, reason, "devices reset");
        Ok((user, count))
    }

    /// Force one device out. Returns `None` when the device does not belong to the user.
    pub async fn logout_device(
        &self,
        user_id: &str,
        record_id: &str,
        reason: Option<&str>,
    ) -> Result<Option<Device>> {
        if self.db.load_device(user_id, record_id).await?.is_none() {
            return Ok(None);
        }
        let reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(LOGOUT_REASON_DEFAULT);

        let changed = self
            .db
            .deactivate_devices(user_id, Some(record_id), reason)
            .await?;
        if changed.is_empty() {
            debug!(user_id, device = record_id, "device already inactive");
        } else {
            info!(user_id, device = record_id, reason, "device logged out");
        }
        self.db.load_device(user_id, record_id).await
    }

    /// Existing device rows are left as they are; enforcement applies from the next login.
    pub async fn set_single_device_login(&self, user_id: &str, enabled: Option<bool>) -> Result<User> {
        let mut user = self
            .db
            .load_user(user_id)
            .await?
            .ok_or_else(|| anyhow!("user {user_id} not found"))?;
        user.single_device_login_enabled = enabled.unwrap_or(!user.single_device_login_enabled);
        self.db.save_user(&user).await?;

        info!(
            user_id,
            enabled = user.single_device_login_enabled,
            "single device login toggled"
        );
        Ok(user)
    }

    /// True while the session on this device row is the current one.
    pub async fn session_is_current(&self, user_id: &str, record_id: &str, session_id: &str) -> Result<bool> {
        Ok(self
            .db
            .load_device(user_id, record_id)
            .await?
            .map(|d| d.is_active && d.session_id.as_deref() == Some(session_id))
            .unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::super::policy::IpScope;
    use super::super::user_agent::samples::*;
    use super::*;

    struct Fixture {
        _dir: tempfile::TempDir,
        db: Arc<DBLayer>,
        gate: DeviceGate,
        user: User,
    }

    async fn fixture() -> Fixture {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Arc::new(DBLayer::new(dir.path().join("db")).expect("open db"));
        let user = User::new("site@example.com", None, "hash".into());
        assert!(db.insert_user(&user).await.unwrap());
        let gate = DeviceGate::new(db.clone(), DeviceMatchPolicy::default());
        Fixture {
            _dir: dir,
            db,
            gate,
            user,
        }
    }

    fn fp(ua: &str, ip: &str) -> RequestFingerprint {
        RequestFingerprint::from_parts(
            Some(ua.to_string()),
            Some("en-US".into()),
            Some("gzip, br".into()),
            ip.parse().ok(),
            IpScope::Subnet,
        )
    }

    impl Fixture {
        async fn reload_user(&self) -> User {
            self.db.load_user(&self.user.id).await.unwrap().unwrap()
        }

        async fn active_rows(&self) -> usize {
            self.db
                .list_devices_for_user(&self.user.id)
                .await
                .unwrap()
                .iter()
                .filter(|d| d.is_active)
                .count()
        }
    }

    #[tokio::test]
    async fn first_login_registers_active_device() {
        let f = fixture().await;
        let decision = f.gate.check_login(&f.user, &fp(CHROME_WINDOWS, "10.0.0.5")).await.unwrap();

        assert!(matches!(decision, LoginDecision::Registered { .. }));
        assert!(decision.allowed());
        assert!(decision.is_new_device());
        let device = decision.device().unwrap();
        assert!(device.session_id.is_some());
        assert_eq!(device.device_name, "Chrome on Windows");
        assert_eq!(f.db.active_device(&f.user.id).await.unwrap().unwrap().id, device.id);
    }

    #[tokio::test]
    async fn patch_version_drift_is_same_device_and_refreshes_row() {
        let f = fixture().await;
        let first = f.gate.check_login(&f.user, &fp(SAFARI_IOS_26_0, "10.0.0.5")).await.unwrap();
        let second = f.gate.check_login(&f.user, &fp(SAFARI_IOS_26_1, "10.0.9.9")).await.unwrap();

        assert!(matches!(second, LoginDecision::SameDevice { .. }));
        let (a, b) = (first.device().unwrap(), second.device().unwrap());
        assert_eq!(a.id, b.id);
        assert_ne!(a.session_id, b.session_id);
        assert_eq!(b.ip_address.as_deref(), Some("10.0.9.9"));
        assert_eq!(b.platform_version.as_deref(), Some("26.1"));
        assert_eq!(f.active_rows().await, 1);
    }

    #[tokio::test]
    async fn other_platform_is_blocked_with_active_device_details() {
        let f = fixture().await;
        f.gate.check_login(&f.user, &fp(CHROME_WINDOWS, "10.0.0.5")).await.unwrap();
        let decision = f.gate.check_login(&f.user, &fp(CHROME_ANDROID, "10.0.0.5")).await.unwrap();

        let LoginDecision::Blocked { active } = &decision else {
            panic!("expected block, got {decision:?}");
        };
        assert!(!decision.allowed());
        let info = active.blocked_info();
        assert_eq!(info.device_name, "Chrome on Windows");
        assert_eq!(info.browser, "Chrome");
        assert_eq!(info.platform, "Windows");
        assert_eq!(info.browser_version.as_deref(), Some("126.0.6478.127"));
        assert_eq!(f.db.list_devices_for_user(&f.user.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn other_browser_family_is_blocked() {
        let f = fixture().await;
        f.gate.check_login(&f.user, &fp(CHROME_WINDOWS, "10.0.0.5")).await.unwrap();
        let decision = f.gate.check_login(&f.user, &fp(FIREFOX_WINDOWS, "10.0.0.5")).await.unwrap();
        assert!(!decision.allowed());
    }

    #[tokio::test]
    async fn disabling_enforcement_admits_blocked_device_without_reset() {
        let f = fixture().await;
        f.gate.check_login(&f.user, &fp(CHROME_WINDOWS, "10.0.0.5")).await.unwrap();
        assert!(!f.gate.check_login(&f.user, &fp(CHROME_MAC, "10.0.0.5")).await.unwrap().allowed());

        let user = f.gate.set_single_device_login(&f.user.id, Some(false)).await.unwrap();
        assert!(!user.single_device_login_enabled);

        let decision = f.gate.check_login(&user, &fp(CHROME_MAC, "10.0.0.5")).await.unwrap();
        assert!(decision.allowed());
        assert!(decision.track_only());
        assert!(decision.is_new_device());

        // Same device again is an update, not a new row.
        let again = f.gate.check_login(&user, &fp(CHROME_MAC, "10.0.0.5")).await.unwrap();
        assert!(!again.is_new_device());
        assert_eq!(f.db.list_devices_for_user(&f.user.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn enabling_enforcement_keeps_rows_and_gates_next_mismatch() {
        let f = fixture().await;
        let user = f.gate.set_single_device_login(&f.user.id, Some(false)).await.unwrap();
        f.gate.check_login(&user, &fp(CHROME_WINDOWS, "10.0.0.5")).await.unwrap();
        f.gate.check_login(&user, &fp(CHROME_MAC, "10.0.0.5")).await.unwrap();

        let user = f.gate.set_single_device_login(&f.user.id, None).await.unwrap();
        assert!(user.single_device_login_enabled);
        assert_eq!(f.active_rows().await, 2);

        // The most recent login holds the pointer.
        assert!(f.gate.check_login(&user, &fp(CHROME_MAC, "10.0.0.5")).await.unwrap().allowed());
        assert!(!f.gate.check_login(&user, &fp(CHROME_ANDROID, "10.0.0.5")).await.unwrap().allowed());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_logins_register_one_device() {
        let f = fixture().await;
        let barrier = Arc::new(tokio::sync::Barrier::new(2));

        let tasks: Vec<_> = [CHROME_WINDOWS, CHROME_ANDROID]
            .into_iter()
            .map(|ua| {
                let (gate, user, barrier) = (f.gate.clone(), f.user.clone(), barrier.clone());
                tokio::spawn(async move {
                    barrier.wait().await;
                    gate.check_login(&user, &fp(ua, "10.0.0.5")).await.unwrap()
                })
            })
            .collect();

        let mut decisions = Vec::new();
        for task in tasks {
            decisions.push(task.await.unwrap());
        }

        let allowed: Vec<_> = decisions.iter().filter_map(|d| d.device()).collect();
        assert_eq!(allowed.len(), 1);
        let blocked = decisions
            .iter()
            .find_map(|d| match d {
                LoginDecision::Blocked { active } => Some(active),
                _ => None,
            })
            .expect("one login is blocked");
        assert_eq!(blocked.id, allowed[0].id);

        assert_eq!(f.active_rows().await, 1);
        let pointer = f.db.active_device(&f.user.id).await.unwrap().unwrap();
        assert_eq!(pointer.id, allowed[0].id);
    }

    #[tokio::test]
    async fn tracking_reuses_row_across_network_change() {
        let f = fixture().await;
        let user = f.gate.set_single_device_login(&f.user.id, Some(false)).await.unwrap();

        let first = f.gate.check_login(&user, &fp(CHROME_WINDOWS, "10.0.0.5")).await.unwrap();
        let second = f.gate.check_login(&user, &fp(CHROME_WINDOWS, "172.16.0.4")).await.unwrap();

        assert!(first.is_new_device());
        assert!(second.track_only());
        assert!(!second.is_new_device());
        assert_eq!(first.device().unwrap().id, second.device().unwrap().id);
        assert_ne!(first.device().unwrap().device_id, second.device().unwrap().device_id);
        assert_eq!(f.db.list_devices_for_user(&f.user.id).await.unwrap().len(), 1);

        // A browser major bump is the same install too.
        let third = f.gate.check_login(&user, &fp(CHROME_WINDOWS_NEXT, "172.16.0.4")).await.unwrap();
        assert!(!third.is_new_device());
        assert_eq!(f.db.list_devices_for_user(&f.user.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn registration_under_enforcement_retires_leftover_tracked_rows() {
        let f = fixture().await;
        let user = f.gate.set_single_device_login(&f.user.id, Some(false)).await.unwrap();
        f.gate.check_login(&user, &fp(CHROME_WINDOWS, "10.0.0.5")).await.unwrap();
        let mac = f.gate.check_login(&user, &fp(CHROME_MAC, "10.0.0.5")).await.unwrap();

        let user = f.gate.set_single_device_login(&f.user.id, Some(true)).await.unwrap();
        f.gate
            .logout_device(&f.user.id, &mac.device().unwrap().id, None)
            .await
            .unwrap();
        assert_eq!(f.active_rows().await, 1);

        let decision = f.gate.check_login(&user, &fp(CHROME_ANDROID, "10.0.0.5")).await.unwrap();
        assert!(matches!(decision, LoginDecision::Registered { .. }));
        assert_eq!(f.active_rows().await, 1);

        let rows = f.db.list_devices_for_user(&f.user.id).await.unwrap();
        let windows = rows.iter().find(|d| d.platform == "Windows").unwrap();
        assert!(!windows.is_active);
        assert_eq!(windows.deactivation_reason.as_deref(), Some(SUPERSEDED_REASON));
    }

    #[tokio::test]
    async fn reset_deactivates_everything_and_next_login_registers() {
        let f = fixture().await;
        f.gate.check_login(&f.user, &fp(CHROME_WINDOWS, "10.0.0.5")).await.unwrap();

        let (user, count) = f.gate.reset_devices(&f.user.id, Some("lost laptop")).await.unwrap();
        assert_eq!(count, 1);
        assert_eq!(user.devices_reset_reason.as_deref(), Some("lost laptop"));
        assert!(user.devices_reset_ts.is_some());
        assert_eq!(f.active_rows().await, 0);

        let rows = f.db.list_devices_for_user(&f.user.id).await.unwrap();
        assert_eq!(rows[0].deactivation_reason.as_deref(), Some("lost laptop"));
        assert!(rows[0].deactivated_ts.is_some());

        let decision = f.gate.check_login(&f.user, &fp(CHROME_ANDROID, "10.0.0.5")).await.unwrap();
        assert!(matches!(decision, LoginDecision::Registered { .. }));
        assert_eq!(f.db.list_devices_for_user(&f.user.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn reset_uses_default_reason_and_unknown_user_errors() {
        let f = fixture().await;
        let (user, count) = f.gate.reset_devices(&f.user.id, Some("  ")).await.unwrap();
        assert_eq!(count, 0);
        assert_eq!(user.devices_reset_reason.as_deref(), Some(RESET_REASON_DEFAULT));
        assert!(f.gate.reset_devices("missing", None).await.is_err());
    }

    #[tokio::test]
    async fn logout_device_ends_session_and_frees_slot() {
        let f = fixture().await;
        let decision = f.gate.check_login(&f.user, &fp(CHROME_WINDOWS, "10.0.0.5")).await.unwrap();
        let device = decision.device().unwrap().clone();
        let session = device.session_id.clone().unwrap();

        assert!(f.gate.session_is_current(&f.user.id, &device.id, &session).await.unwrap());

        let out = f.gate.logout_device(&f.user.id, &device.id, None).await.unwrap().unwrap();
        assert!(!out.is_active);
        assert_eq!(out.deactivation_reason.as_deref(), Some(LOGOUT_REASON_DEFAULT));
        assert!(!f.gate.session_is_current(&f.user.id, &device.id, &session).await.unwrap());
        assert!(f.gate.logout_device(&f.user.id, "nope", None).await.unwrap().is_none());

        let next = f.gate.check_login(&f.user, &fp(CHROME_MAC, "10.0.0.5")).await.unwrap();
        assert!(matches!(next, LoginDecision::Registered { .. }));
    }

    #[tokio::test]
    async fn relogin_supersedes_previous_session() {
        let f = fixture().await;
        let first = f.gate.check_login(&f.user, &fp(CHROME_WINDOWS, "10.0.0.5")).await.unwrap();
        let old = first.device().unwrap().clone();
        f.gate.check_login(&f.user, &fp(CHROME_WINDOWS, "10.0.0.5")).await.unwrap();

        let old_session = old.session_id.unwrap();
        assert!(!f.gate.session_is_current(&f.user.id, &old.id, &old_session).await.unwrap());
    }
}
