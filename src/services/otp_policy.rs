// src/services/otp_policy.rs
//
// Máquina de estados do OTP e do bloqueio de login, sem I/O.
// O `OtpService` carrega a linha de `user_security`, aplica a transição
// e persiste o resultado na mesma transação.

use chrono::{DateTime, Duration, Utc};

use crate::{
    common::{clock::minutes_until, error::AppError},
    models::auth::UserSecurity,
};

#[derive(Debug, Clone)]
pub struct OtpPolicy {
    pub validity: Duration,
    pub max_attempts: i32,
    pub lock_duration: Duration,
    pub max_resend: i32,
    pub login_max_attempts: i32,
    pub login_lock_duration: Duration,
}

impl Default for OtpPolicy {
    fn default() -> Self {
        Self {
            validity: Duration::minutes(5),
            max_attempts: 3,
            lock_duration: Duration::minutes(15),
            max_resend: 5,
            login_max_attempts: 5,
            login_lock_duration: Duration::minutes(15),
        }
    }
}

// Resultado de uma tentativa de verificação. Toda variante pode ter
// alterado a linha; o chamador sempre persiste antes de responder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    Verified,
    Mismatch { remaining: i32 },
    LockedNow { until: DateTime<Utc> },
    OtpLocked { until: DateTime<Utc> },
    ResendQuotaExceeded { until: DateTime<Utc> },
    LoginLocked { until: DateTime<Utc> },
}

impl VerifyOutcome {
    pub fn into_result(self, now: DateTime<Utc>) -> Result<(), AppError> {
        match self {
            VerifyOutcome::Verified => Ok(()),
            VerifyOutcome::Mismatch { remaining } => Err(AppError::BadRequest(format!(
                "Invalid or expired OTP. {} attempt(s) remaining.",
                remaining
            ))),
            VerifyOutcome::LockedNow { until } | VerifyOutcome::OtpLocked { until } => {
                Err(otp_locked(now, until))
            }
            VerifyOutcome::ResendQuotaExceeded { until } => Err(resend_limit(now, until)),
            VerifyOutcome::LoginLocked { until } => Err(login_locked(now, until)),
        }
    }
}

pub fn otp_locked(now: DateTime<Utc>, until: DateTime<Utc>) -> AppError {
    AppError::Locked(format!(
        "Too many invalid OTP attempts. Try again in {} minute(s).",
        minutes_until(now, until)
    ))
}

pub fn resend_limit(now: DateTime<Utc>, until: DateTime<Utc>) -> AppError {
    AppError::Locked(format!(
        "OTP resend limit reached. Try again in {} minute(s).",
        minutes_until(now, until)
    ))
}

pub fn login_locked(now: DateTime<Utc>, until: DateTime<Utc>) -> AppError {
    AppError::Locked(format!(
        "Account locked due to multiple failed login attempts. Try again in {} minute(s) (unlocks at {}).",
        minutes_until(now, until),
        until.format("%Y-%m-%d %H:%M:%S UTC")
    ))
}

fn active(lock: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    lock.filter(|until| *until > now)
}

impl OtpPolicy {
    /// Bloqueios vencidos voltam o usuário para o estado ocioso.
    pub fn release_expired_locks(&self, sec: &mut UserSecurity, now: DateTime<Utc>) {
        if sec.otp_locked_until.is_some_and(|until| until <= now) {
            sec.otp_locked_until = None;
            sec.otp_attempts = 0;
            sec.otp_resend_count = 0;
            sec.otp_code = None;
            sec.otp_expiry = None;
            sec.otp_pending_verification = false;
        }
        if sec.login_locked_until.is_some_and(|until| until <= now) {
            sec.login_locked_until = None;
            sec.failed_login_attempts = 0;
        }
    }

    // ---
    // Envio
    // ---
    pub fn check_send(&self, sec: &mut UserSecurity, now: DateTime<Utc>) -> Result<(), AppError> {
        self.release_expired_locks(sec, now);

        if let Some(until) = active(sec.otp_locked_until, now) {
            return Err(otp_locked(now, until));
        }
        if let Some(until) = active(sec.login_locked_until, now) {
            return Err(login_locked(now, until));
        }
        if sec.otp_pending_verification && sec.otp_resend_count >= self.max_resend {
            let until = now + self.lock_duration;
            sec.otp_locked_until = Some(until);
            return Err(resend_limit(now, until));
        }
        Ok(())
    }

    pub fn record_send(&self, sec: &mut UserSecurity, code: String, now: DateTime<Utc>) {
        sec.otp_code = Some(code);
        sec.otp_expiry = Some(now + self.validity);
        sec.otp_resend_count += 1;
        sec.otp_pending_verification = true;
        sec.last_otp_sent_at = Some(now);
    }

    // ---
    // Verificação
    // ---
    // `totp_ok` é `Some(..)` só quando o usuário tem segredo TOTP.
    pub fn verify(
        &self,
        sec: &mut UserSecurity,
        submitted: &str,
        totp_ok: Option<bool>,
        now: DateTime<Utc>,
    ) -> VerifyOutcome {
        self.release_expired_locks(sec, now);

        if let Some(until) = active(sec.otp_locked_until, now) {
            return VerifyOutcome::OtpLocked { until };
        }
        if sec.otp_pending_verification && sec.otp_resend_count >= self.max_resend {
            let until = now + self.lock_duration;
            sec.otp_locked_until = Some(until);
            return VerifyOutcome::ResendQuotaExceeded { until };
        }
        if let Some(until) = active(sec.login_locked_until, now) {
            return VerifyOutcome::LoginLocked { until };
        }

        let code_matches = sec.otp_code.as_deref() == Some(submitted)
            && sec.otp_expiry.is_some_and(|expiry| expiry >= now);
        let matched = code_matches && totp_ok.unwrap_or(true);

        if !matched {
            sec.otp_attempts += 1;
            if sec.otp_attempts >= self.max_attempts {
                let until = now + self.lock_duration;
                sec.otp_locked_until = Some(until);
                sec.otp_attempts = 0;
                return VerifyOutcome::LockedNow { until };
            }
            return VerifyOutcome::Mismatch { remaining: self.max_attempts - sec.otp_attempts };
        }

        sec.otp_code = None;
        sec.otp_expiry = None;
        sec.otp_attempts = 0;
        sec.otp_locked_until = None;
        sec.otp_resend_count = 0;
        sec.otp_pending_verification = false;
        VerifyOutcome::Verified
    }

    // ---
    // Login
    // ---
    pub fn check_login(&self, sec: &mut UserSecurity, now: DateTime<Utc>) -> Result<(), AppError> {
        self.release_expired_locks(sec, now);
        match active(sec.login_locked_until, now) {
            Some(until) => Err(login_locked(now, until)),
            None => Ok(()),
        }
    }

    /// Retorna o fim do bloqueio quando esta falha atinge o limite.
    pub fn record_login_failure(&self, sec: &mut UserSecurity, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        sec.failed_login_attempts += 1;
        if sec.failed_login_attempts >= self.login_max_attempts {
            let until = now + self.login_lock_duration;
            sec.login_locked_until = Some(until);
            return Some(until);
        }
        None
    }

    pub fn record_login_success(&self, sec: &mut UserSecurity) {
        sec.failed_login_attempts = 0;
        sec.login_locked_until = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn policy() -> OtpPolicy {
        OtpPolicy {
            max_attempts: 3,
            lock_duration: Duration::minutes(15),
            ..OtpPolicy::default()
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap()
    }

    fn sent(code: &str) -> UserSecurity {
        let mut sec = UserSecurity::fresh(Uuid::new_v4());
        policy().record_send(&mut sec, code.to_string(), t0());
        sec
    }

    #[test]
    fn send_marks_pending_and_stamps_expiry() {
        let sec = sent("123456");
        assert!(sec.otp_pending_verification);
        assert_eq!(sec.otp_resend_count, 1);
        assert_eq!(sec.otp_expiry, Some(t0() + Duration::minutes(5)));
        assert_eq!(sec.last_otp_sent_at, Some(t0()));
    }

    #[test]
    fn three_wrong_codes_lock_and_reset_attempts() {
        let p = policy();
        let mut sec = sent("123456");

        assert_eq!(p.verify(&mut sec, "000000", None, t0()), VerifyOutcome::Mismatch { remaining: 2 });
        assert_eq!(p.verify(&mut sec, "000000", None, t0()), VerifyOutcome::Mismatch { remaining: 1 });
        let third = p.verify(&mut sec, "000000", None, t0());
        assert_eq!(third, VerifyOutcome::LockedNow { until: t0() + Duration::minutes(15) });
        assert_eq!(sec.otp_locked_until, Some(t0() + Duration::minutes(15)));
        assert_eq!(sec.otp_attempts, 0);

        let err = third.into_result(t0()).unwrap_err();
        assert!(matches!(err, AppError::Locked(_)));
    }

    #[test]
    fn correct_code_is_rejected_while_locked_then_fresh_code_succeeds() {
        let p = policy();
        let mut sec = sent("123456");
        for _ in 0..3 {
            p.verify(&mut sec, "000000", None, t0());
        }

        let before_unlock = t0() + Duration::minutes(5);
        assert!(matches!(
            p.verify(&mut sec, "123456", None, before_unlock),
            VerifyOutcome::OtpLocked { .. }
        ));

        let later = t0() + Duration::minutes(16);
        p.check_send(&mut sec, later).unwrap();
        p.record_send(&mut sec, "654321".into(), later);
        assert_eq!(p.verify(&mut sec, "654321", None, later), VerifyOutcome::Verified);

        assert_eq!(sec.otp_code, None);
        assert_eq!(sec.otp_expiry, None);
        assert_eq!(sec.otp_attempts, 0);
        assert_eq!(sec.otp_locked_until, None);
        assert_eq!(sec.otp_resend_count, 0);
        assert!(!sec.otp_pending_verification);
    }

    #[test]
    fn attempts_never_exceed_threshold() {
        let p = policy();
        let mut sec = sent("123456");
        for _ in 0..10 {
            p.verify(&mut sec, "999999", None, t0());
            assert!(sec.otp_attempts < p.max_attempts);
        }
    }

    #[test]
    fn expired_code_does_not_match() {
        let p = policy();
        let mut sec = sent("123456");
        let outcome = p.verify(&mut sec, "123456", None, t0() + Duration::minutes(6));
        assert_eq!(outcome, VerifyOutcome::Mismatch { remaining: 2 });
    }

    #[test]
    fn totp_check_is_required_when_secret_present() {
        let p = policy();
        let mut sec = sent("123456");
        let outcome = p.verify(&mut sec, "123456", Some(false), t0());
        assert!(matches!(outcome, VerifyOutcome::Mismatch { .. }));
        assert_eq!(p.verify(&mut sec, "123456", Some(true), t0()), VerifyOutcome::Verified);
    }

    #[test]
    fn send_is_rejected_while_locked() {
        let p = policy();
        let mut sec = sent("123456");
        sec.otp_locked_until = Some(t0() + Duration::minutes(10));
        let err = p.check_send(&mut sec, t0()).unwrap_err();
        assert!(err.to_string().contains("10 minute(s)"));
    }

    #[test]
    fn resend_quota_locks_while_pending() {
        let p = OtpPolicy { max_resend: 2, ..policy() };
        let mut sec = UserSecurity::fresh(Uuid::new_v4());
        for _ in 0..2 {
            p.check_send(&mut sec, t0()).unwrap();
            p.record_send(&mut sec, "111111".into(), t0());
        }
        assert!(matches!(p.check_send(&mut sec, t0()), Err(AppError::Locked(_))));
        assert_eq!(sec.otp_locked_until, Some(t0() + Duration::minutes(15)));
    }

    #[test]
    fn login_lock_after_threshold_and_release_after_expiry() {
        let p = OtpPolicy { login_max_attempts: 2, ..policy() };
        let mut sec = UserSecurity::fresh(Uuid::new_v4());
        assert_eq!(p.record_login_failure(&mut sec, t0()), None);
        assert_eq!(
            p.record_login_failure(&mut sec, t0()),
            Some(t0() + Duration::minutes(15))
        );
        assert!(p.check_login(&mut sec, t0() + Duration::minutes(1)).is_err());

        p.check_login(&mut sec, t0() + Duration::minutes(16)).unwrap();
        assert_eq!(sec.failed_login_attempts, 0);
    }

    #[test]
    fn login_lock_blocks_otp_verification() {
        let p = policy();
        let mut sec = sent("123456");
        sec.login_locked_until = Some(t0() + Duration::minutes(3));
        assert!(matches!(
            p.verify(&mut sec, "123456", None, t0()),
            VerifyOutcome::LoginLocked { .. }
        ));
    }

    #[test]
    fn success_resets_failed_logins() {
        let p = policy();
        let mut sec = UserSecurity::fresh(Uuid::new_v4());
        p.record_login_failure(&mut sec, t0());
        p.record_login_success(&mut sec);
        assert_eq!(sec.failed_login_attempts, 0);
    }
}
