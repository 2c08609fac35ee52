use crate::domain::billing::{BillingPolicy, elapsed_hours};
use crate::domain::clock::{Clock, SystemClock};
use crate::domain::geofence::{Coordinate, Geofence};
use crate::domain::money::{Amount, Balance};
use crate::domain::ports::{BalanceStoreBox, SessionStoreBox, UserStoreBox};
use crate::domain::session::Session;
use crate::domain::user::{UserId, UserProfile};
use crate::error::{MallError, Result};
use crate::interfaces::location::LocationProvider;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tracing::{info, warn};

/// One-time password accepted by [`MallService::sign_in`] unless configured otherwise.
pub const DEMO_OTP: &str = "123456";
pub const DEFAULT_LOW_BALANCE: Decimal = dec!(50);

/// What happened when a user was seen leaving the mall.
#[derive(Debug, Clone, PartialEq)]
pub enum ExitOutcome {
    /// The user had no open session.
    NoActiveSession,
    /// The stay fit in the free period.
    NoCharge { stayed: Duration },
    /// The charge was collected.
    Charged { amount: Amount, balance: Balance },
    /// The balance could not cover the charge. It is not collected later.
    InsufficientBalance { charge: Amount, balance: Balance },
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrackOutcome {
    InsideMall,
    LeftMall(ExitOutcome),
}

/// A row of the admin view of users currently inside.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveSessionReport {
    pub user_id: UserId,
    pub name: String,
    pub phone: String,
    pub entry_time: DateTime<Utc>,
    pub minutes_inside: f64,
    pub balance: Balance,
    pub low_balance: bool,
}

/// Tunables for [`MallService`].
#[derive(Debug, Clone)]
pub struct MallSettings {
    pub geofence: Geofence,
    pub billing: BillingPolicy,
    pub low_balance: Decimal,
    pub otp: String,
}

impl Default for MallSettings {
    fn default() -> Self {
        Self {
            geofence: Geofence::default(),
            billing: BillingPolicy::default(),
            low_balance: DEFAULT_LOW_BALANCE,
            otp: DEMO_OTP.to_string(),
        }
    }
}

/// Registration, mall entry/exit and billing on top of the store ports.
///
/// Holds no state between calls besides the stores themselves; every
/// operation reads what it needs from the stores and writes it back.
pub struct MallService {
    users: UserStoreBox,
    sessions: SessionStoreBox,
    balances: BalanceStoreBox,
    clock: Arc<dyn Clock>,
    settings: MallSettings,
}

impl MallService {
    /// Creates a service that reads the wall clock.
    pub fn new(
        users: UserStoreBox,
        sessions: SessionStoreBox,
        balances: BalanceStoreBox,
        settings: MallSettings,
    ) -> Self {
        Self::with_clock(users, sessions, balances, settings, Arc::new(SystemClock))
    }

    /// Creates a service driven by `clock`, used to simulate elapsed time.
    pub fn with_clock(
        users: UserStoreBox,
        sessions: SessionStoreBox,
        balances: BalanceStoreBox,
        settings: MallSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            sessions,
            balances,
            clock,
            settings,
        }
    }

    pub fn settings(&self) -> &MallSettings {
        &self.settings
    }

    /// Registers the profile under its email (or phone when no email is given).
    ///
    /// Fails with [`MallError::UserAlreadyExists`] if the id is taken.
    pub async fn register(&self, profile: UserProfile) -> Result<UserId> {
        let user_id = profile.user_id()?;
        if !self.users.register(&user_id, profile).await? {
            return Err(MallError::UserAlreadyExists(user_id.to_string()));
        }
        info!(user = %user_id, "user registered");
        Ok(user_id)
    }

    /// Demo sign-in: the user must be registered and present the configured OTP.
    pub async fn sign_in(&self, user_id: &str, otp: &str) -> Result<UserId> {
        let user_id = UserId::parse(user_id)?;
        if !self.users.exists(&user_id).await? {
            return Err(MallError::UnknownUser(user_id.to_string()));
        }
        if otp != self.settings.otp {
            warn!(user = %user_id, "sign-in rejected: invalid otp");
            return Err(MallError::InvalidOtp);
        }
        info!(user = %user_id, "signed in");
        Ok(user_id)
    }

    /// Opens a session for the profile's user, stamped with the current time.
    ///
    /// An already-open session is replaced and its entry time lost.
    pub async fn enter(&self, profile: UserProfile) -> Result<UserId> {
        let user_id = profile.user_id()?;
        let entry_time = self.clock.now();
        let replaced = self
            .sessions
            .start(&user_id, Session::new(entry_time, profile))
            .await?;
        if let Some(previous) = replaced {
            warn!(
                user = %user_id,
                previous_entry = %previous.entry_time,
                "open session replaced by new entry"
            );
        }
        info!(user = %user_id, entry_time = %entry_time, "entered mall");
        Ok(user_id)
    }

    /// Closes the user's session and bills the stay.
    pub async fn exit(&self, user_id: &UserId) -> Result<ExitOutcome> {
        let Some(session) = self.sessions.end(user_id).await? else {
            info!(user = %user_id, "exit without active session");
            return Ok(ExitOutcome::NoActiveSession);
        };

        let now = self.clock.now();
        let charge = self.settings.billing.charge(session.entry_time, now);
        let Ok(charge) = Amount::new(charge) else {
            info!(user = %user_id, hours = elapsed_hours(session.entry_time, now), "exit within free period");
            return Ok(ExitOutcome::NoCharge {
                stayed: now - session.entry_time,
            });
        };

        if self.balances.deduct(user_id, charge).await? {
            let balance = self.balances.get(user_id).await?;
            info!(user = %user_id, %charge, %balance, "exit charge collected");
            Ok(ExitOutcome::Charged {
                amount: charge,
                balance,
            })
        } else {
            let balance = self.balances.get(user_id).await?;
            warn!(user = %user_id, %charge, %balance, "insufficient balance, charge forgiven");
            Ok(ExitOutcome::InsufficientBalance { charge, balance })
        }
    }

    /// Reacts to a position fix: leaving the geofence closes and bills the
    /// session, staying inside does nothing.
    pub async fn track(&self, user_id: &UserId, position: Coordinate) -> Result<TrackOutcome> {
        if self.settings.geofence.contains(&position) {
            info!(user = %user_id, lat = position.latitude, lon = position.longitude, "inside mall");
            return Ok(TrackOutcome::InsideMall);
        }
        info!(user = %user_id, lat = position.latitude, lon = position.longitude, "outside mall");
        Ok(TrackOutcome::LeftMall(self.exit(user_id).await?))
    }

    /// Asks `provider` for the user's current position and handles it like [`MallService::track`].
    pub async fn track_with(
        &self,
        user_id: &UserId,
        provider: &dyn LocationProvider,
    ) -> Result<TrackOutcome> {
        let position = provider.current_position().await?;
        self.track(user_id, position).await
    }

    /// Adds `amount` to the user's prepaid balance and returns the new balance.
    pub async fn top_up(&self, user_id: &UserId, amount: Amount) -> Result<Balance> {
        let balance = self.balances.add(user_id, amount).await?;
        info!(user = %user_id, %amount, %balance, "balance topped up");
        Ok(balance)
    }

    /// The user's prepaid balance, zero if they never topped up.
    pub async fn balance(&self, user_id: &UserId) -> Result<Balance> {
        self.balances.get(user_id).await
    }

    /// Everyone currently inside, with time spent so far and balance.
    pub async fn active_sessions(&self) -> Result<Vec<ActiveSessionReport>> {
        let now = self.clock.now();
        let mut reports = Vec::new();
        for (user_id, session) in self.sessions.list_all().await? {
            let balance = self.balances.get(&user_id).await?;
            let minutes = elapsed_hours(session.entry_time, now) * 60.0;
            let low_balance = balance.value() < self.settings.low_balance;
            if low_balance {
                warn!(user = %user_id, name = %session.data.name, %balance, "low balance");
            }
            reports.push(ActiveSessionReport {
                name: session.data.name,
                phone: session.data.phone,
                entry_time: session.entry_time,
                minutes_inside: (minutes * 100.0).round() / 100.0,
                balance,
                low_balance,
                user_id,
            });
        }
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::geofence::DEFAULT_CENTER;
    use crate::domain::clock::ManualClock;
    use crate::infrastructure::in_memory::{
        InMemoryBalanceStore, InMemorySessionStore, InMemoryUserStore,
    };
    use crate::interfaces::location::FixedLocation;

    fn service(clock: &ManualClock) -> MallService {
        MallService::with_clock(
            Box::new(InMemoryUserStore::new()),
            Box::new(InMemorySessionStore::new()),
            Box::new(InMemoryBalanceStore::new()),
            MallSettings::default(),
            Arc::new(clock.clone()),
        )
    }

    fn asha() -> UserProfile {
        UserProfile::new("Asha", "asha@example.com", "9876543210")
    }

    fn amount(value: Decimal) -> Amount {
        Amount::new(value).unwrap()
    }

    #[tokio::test]
    async fn test_register_and_sign_in() {
        let clock = ManualClock::new(Utc::now());
        let mall = service(&clock);

        let id = mall.register(asha()).await.unwrap();
        assert_eq!(id.as_str(), "asha@example.com");
        assert!(matches!(
            mall.register(asha()).await,
            Err(MallError::UserAlreadyExists(_))
        ));

        assert_eq!(mall.sign_in("asha@example.com", DEMO_OTP).await.unwrap(), id);
        assert!(matches!(
            mall.sign_in("asha@example.com", "000000").await,
            Err(MallError::InvalidOtp)
        ));
        assert!(matches!(
            mall.sign_in("ghost@example.com", DEMO_OTP).await,
            Err(MallError::UnknownUser(_))
        ));
    }

    #[tokio::test]
    async fn test_enter_requires_identifier() {
        let clock = ManualClock::new(Utc::now());
        let mall = service(&clock);

        let result = mall.enter(UserProfile::new("Anon", "", "  ")).await;
        assert!(matches!(result, Err(MallError::ValidationError(_))));
        assert!(mall.active_sessions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_exit_without_session() {
        let clock = ManualClock::new(Utc::now());
        let mall = service(&clock);
        let id = UserId::parse("nobody").unwrap();

        assert_eq!(mall.exit(&id).await.unwrap(), ExitOutcome::NoActiveSession);
    }

    #[tokio::test]
    async fn test_exit_within_free_hour() {
        let clock = ManualClock::new(Utc::now());
        let mall = service(&clock);
        let id = mall.enter(asha()).await.unwrap();

        clock.advance(Duration::minutes(45));
        assert_eq!(
            mall.exit(&id).await.unwrap(),
            ExitOutcome::NoCharge {
                stayed: Duration::minutes(45)
            }
        );
        assert_eq!(mall.exit(&id).await.unwrap(), ExitOutcome::NoActiveSession);
    }

    #[tokio::test]
    async fn test_exit_charges_overage() {
        let clock = ManualClock::new(Utc::now());
        let mall = service(&clock);
        let id = mall.enter(asha()).await.unwrap();
        mall.top_up(&id, amount(dec!(100))).await.unwrap();

        clock.advance(Duration::hours(2));
        assert_eq!(
            mall.exit(&id).await.unwrap(),
            ExitOutcome::Charged {
                amount: amount(dec!(60)),
                balance: Balance::new(dec!(40)).unwrap(),
            }
        );
    }

    #[tokio::test]
    async fn test_exit_with_insufficient_balance_is_forgiven() {
        let clock = ManualClock::new(Utc::now());
        let mall = service(&clock);
        let id = mall.enter(asha()).await.unwrap();
        mall.top_up(&id, amount(dec!(50))).await.unwrap();

        clock.advance(Duration::hours(2));
        assert_eq!(
            mall.exit(&id).await.unwrap(),
            ExitOutcome::InsufficientBalance {
                charge: amount(dec!(60)),
                balance: Balance::new(dec!(50)).unwrap(),
            }
        );
        assert_eq!(mall.balance(&id).await.unwrap(), Balance::new(dec!(50)).unwrap());
        // the session is closed either way
        assert_eq!(mall.exit(&id).await.unwrap(), ExitOutcome::NoActiveSession);
    }

    #[tokio::test]
    async fn test_reentry_replaces_entry_time() {
        let clock = ManualClock::new(Utc::now());
        let mall = service(&clock);
        let id = mall.enter(asha()).await.unwrap();
        mall.top_up(&id, amount(dec!(100))).await.unwrap();

        clock.advance(Duration::hours(3));
        mall.enter(asha()).await.unwrap();
        clock.advance(Duration::minutes(30));

        assert!(matches!(
            mall.exit(&id).await.unwrap(),
            ExitOutcome::NoCharge { .. }
        ));
        assert_eq!(mall.balance(&id).await.unwrap(), Balance::new(dec!(100)).unwrap());
    }

    #[tokio::test]
    async fn test_track_inside_is_informational() {
        let clock = ManualClock::new(Utc::now());
        let mall = service(&clock);
        let id = mall.enter(asha()).await.unwrap();
        clock.advance(Duration::hours(2));

        let outcome = mall.track(&id, DEFAULT_CENTER).await.unwrap();
        assert_eq!(outcome, TrackOutcome::InsideMall);
        assert_eq!(mall.active_sessions().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_track_outside_exits() {
        let clock = ManualClock::new(Utc::now());
        let mall = service(&clock);
        let id = mall.enter(asha()).await.unwrap();
        mall.top_up(&id, amount(dec!(100))).await.unwrap();
        clock.advance(Duration::minutes(90));

        let away = FixedLocation::new(Coordinate::new(
            DEFAULT_CENTER.latitude + 0.01,
            DEFAULT_CENTER.longitude,
        ));
        let outcome = mall.track_with(&id, &away).await.unwrap();
        assert_eq!(
            outcome,
            TrackOutcome::LeftMall(ExitOutcome::Charged {
                amount: amount(dec!(30)),
                balance: Balance::new(dec!(70)).unwrap(),
            })
        );
    }

    #[tokio::test]
    async fn test_active_sessions_report() {
        let clock = ManualClock::new(Utc::now());
        let mall = service(&clock);
        let rich = mall.enter(asha()).await.unwrap();
        mall.top_up(&rich, amount(dec!(500))).await.unwrap();
        clock.advance(Duration::seconds(90));
        mall.enter(UserProfile::new("Ravi", "", "555")).await.unwrap();
        clock.advance(Duration::seconds(30));

        let reports = mall.active_sessions().await.unwrap();
        assert_eq!(reports.len(), 2);

        assert_eq!(reports[0].name, "Asha");
        assert_eq!(reports[0].minutes_inside, 2.0);
        assert!(!reports[0].low_balance);

        assert_eq!(reports[1].user_id.as_str(), "555");
        assert_eq!(reports[1].minutes_inside, 0.5);
        assert_eq!(reports[1].balance, Balance::ZERO);
        assert!(reports[1].low_balance);
    }
}
