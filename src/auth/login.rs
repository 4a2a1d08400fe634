//! Login orchestration: challenge issuance, callback verification and status
//! polling.
//!
//! The service holds no mutable state of its own; every transition goes
//! through the [`SecretStore`]. Store calls are the only await points and each
//! one is bounded by the configured timeout. A timed-out call is reported as
//! `Unavailable` and nothing is written.

use secp256k1::{Secp256k1, VerifyOnly};
use secrecy::ExposeSecret;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::error::LoginError;
use super::params::LoginRequest;
use super::store::{SecretStore, SessionStatus, StoreError, Transition};
use super::types::{ChallengeResponse, SessionStatusResponse};
use super::verifier::{self, VerifyError};
use crate::lnurl;

const CALLBACK_PATH: &str = "/v1/auth/lnurl";

pub struct LoginService {
    store: Arc<dyn SecretStore>,
    secp: Secp256k1<VerifyOnly>,
    store_timeout: Duration,
}

impl LoginService {
    pub fn new(store: Arc<dyn SecretStore>, store_timeout: Duration) -> Self {
        Self {
            store,
            secp: Secp256k1::verification_only(),
            store_timeout,
        }
    }

    /// Start a login: issue a session and build the LNURL the wallet scans.
    ///
    /// # Errors
    /// `Unavailable` when the store fails or the callback URL cannot be built.
    #[instrument(skip(self))]
    pub async fn issue_challenge(&self, public_url: &str) -> Result<ChallengeResponse, LoginError> {
        let challenge = self.store_call(self.store.issue()).await?;
        let k1 = hex::encode(challenge.secret.expose_secret());

        let mut url = Url::parse(&format!(
            "{}{CALLBACK_PATH}/{}",
            public_url.trim_end_matches('/'),
            challenge.session_id
        ))
        .map_err(|e| LoginError::Unavailable(format!("invalid public url: {e}")))?;
        url.query_pairs_mut()
            .append_pair("tag", "login")
            .append_pair("k1", &k1)
            .append_pair("action", "login");

        let lnurl = lnurl::encode(url.as_str())
            .map_err(|e| LoginError::Unavailable(format!("failed to encode lnurl: {e}")))?;

        debug!("issued challenge for session {}", challenge.session_id);

        Ok(ChallengeResponse {
            session_id: challenge.session_id,
            k1,
            url: url.to_string(),
            lnurl,
        })
    }

    /// Verify a wallet callback for `session_id`.
    ///
    /// # Errors
    /// Any [`LoginError`]; only `Unavailable` indicates a server-side fault.
    #[instrument(skip(self, params))]
    pub async fn complete_login(
        &self,
        session_id: &str,
        params: &HashMap<String, String>,
    ) -> Result<(), LoginError> {
        let request = LoginRequest::from_params(params)?;

        let record = self.store_call(self.store.lookup(session_id)).await?;
        match record.status {
            SessionStatus::Pending => {}
            SessionStatus::Verified => {
                if record.linking_key.as_deref() != Some(request.key()) {
                    warn!("rejected identity substitution on verified session");
                    return Err(LoginError::SessionExpired);
                }
            }
            SessionStatus::Expired | SessionStatus::Consumed => {
                debug!("session is {:?}", record.status);
                return Err(LoginError::SessionExpired);
            }
        }

        let outcome = verifier::verify(
            &self.secp,
            record.secret.expose_secret(),
            request.sig(),
            request.key(),
        );
        drop(record.secret);

        if let Err(err) = check_outcome(outcome) {
            if record.status == SessionStatus::Pending {
                self.register_failure(session_id).await?;
            }
            return Err(err);
        }

        if record.status == SessionStatus::Verified {
            debug!("re-delivering success for verified session");
            return Ok(());
        }

        match self
            .store_call(self.store.transition_to_verified(session_id, request.key()))
            .await?
        {
            Transition::Verified => {
                info!("login verified");
                Ok(())
            }
            Transition::AlreadyVerified(linked) if linked.as_slice() == request.key() => {
                debug!("concurrent duplicate callback for verified session");
                Ok(())
            }
            Transition::AlreadyVerified(_) => {
                warn!("session was verified with another key");
                Err(LoginError::SessionExpired)
            }
        }
    }

    /// Report the session status; the first poll that sees `VERIFIED`
    /// consumes the session and returns the linking key.
    ///
    /// # Errors
    /// `SessionNotFound`/`SessionExpired` for unknown, expired or already
    /// consumed sessions, `Unavailable` on store failure.
    #[instrument(skip(self))]
    pub async fn session_status(&self, session_id: &str) -> Result<SessionStatusResponse, LoginError> {
        let record = self.store_call(self.store.lookup(session_id)).await?;

        match record.status {
            SessionStatus::Pending => Ok(SessionStatusResponse {
                status: SessionStatus::Pending,
                key: None,
            }),
            SessionStatus::Verified => {
                let key = self.store_call(self.store.consume(session_id)).await?;
                Ok(SessionStatusResponse {
                    status: SessionStatus::Verified,
                    key: Some(hex::encode(key)),
                })
            }
            SessionStatus::Expired | SessionStatus::Consumed => Err(LoginError::SessionExpired),
        }
    }

    async fn register_failure(&self, session_id: &str) -> Result<(), LoginError> {
        match self.store_call(self.store.record_failure(session_id)).await {
            Ok(SessionStatus::Expired) => {
                warn!("session locked after repeated invalid signatures");
                Ok(())
            }
            Ok(_) | Err(LoginError::SessionNotFound | LoginError::SessionExpired) => Ok(()),
            Err(err) => Err(err),
        }
    }

    async fn store_call<T, F>(&self, call: F) -> Result<T, LoginError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.store_timeout, call).await {
            Ok(result) => result.map_err(LoginError::from),
            Err(_) => {
                warn!("secret store call timed out after {:?}", self.store_timeout);
                Err(LoginError::Unavailable("secret store timed out".to_string()))
            }
        }
    }
}

fn check_outcome(outcome: Result<bool, VerifyError>) -> Result<(), LoginError> {
    match outcome {
        Ok(true) => Ok(()),
        Ok(false) => Err(LoginError::InvalidSignature),
        Err(VerifyError::InvalidPublicKey) => Err(LoginError::InvalidPublicKey),
        Err(VerifyError::InvalidSignatureEncoding) => Err(LoginError::InvalidSignatureEncoding),
    }
}

impl From<StoreError> for LoginError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::SessionNotFound,
            StoreError::InvalidState(_) => Self::SessionExpired,
            StoreError::Unavailable(reason) => Self::Unavailable(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::{Challenge, MemoryStore, SessionRecord};
    use crate::auth::verifier::test_support::TestWallet;
    use anyhow::{Context, Result};
    use async_trait::async_trait;

    const PUBLIC_URL: &str = "https://auth.example.com";

    fn service() -> (Arc<MemoryStore>, LoginService) {
        let store = Arc::new(MemoryStore::new(Duration::from_secs(60), 3));
        let service = LoginService::new(store.clone(), Duration::from_secs(1));
        (store, service)
    }

    fn k1_bytes(k1: &str) -> Result<[u8; 32]> {
        let bytes = hex::decode(k1)?;
        <[u8; 32]>::try_from(bytes.as_slice()).context("k1 must be 32 bytes")
    }

    fn params(sig: &[u8], key: &[u8]) -> HashMap<String, String> {
        HashMap::from([
            ("sig".to_string(), hex::encode(sig)),
            ("key".to_string(), hex::encode(key)),
        ])
    }

    async fn status(store: &MemoryStore, session_id: &str) -> Result<SessionStatus> {
        Ok(store.lookup(session_id).await?.status)
    }

    #[tokio::test]
    async fn issue_challenge_builds_lnurl_for_callback() -> Result<()> {
        let (_store, service) = service();
        let challenge = service.issue_challenge(PUBLIC_URL).await?;

        assert_eq!(challenge.k1.len(), 64);
        assert!(challenge.url.starts_with(&format!(
            "{PUBLIC_URL}/v1/auth/lnurl/{}?tag=login&k1=",
            challenge.session_id
        )));
        assert!(challenge.url.ends_with("&action=login"));
        assert_eq!(lnurl::decode(&challenge.lnurl)?, challenge.url);
        Ok(())
    }

    #[tokio::test]
    async fn valid_signature_verifies_session() -> Result<()> {
        let (store, service) = service();
        let challenge = service.issue_challenge(PUBLIC_URL).await?;
        let wallet = TestWallet::new(11);
        let sig = wallet.sign_der(&k1_bytes(&challenge.k1)?);

        service
            .complete_login(&challenge.session_id, &params(&sig, &wallet.public_key()))
            .await?;

        assert_eq!(
            status(&store, &challenge.session_id).await?,
            SessionStatus::Verified
        );
        Ok(())
    }

    #[tokio::test]
    async fn missing_parameters_leave_session_pending() -> Result<()> {
        let (store, service) = service();
        let challenge = service.issue_challenge(PUBLIC_URL).await?;

        let err = service
            .complete_login(&challenge.session_id, &HashMap::new())
            .await
            .err();
        assert_eq!(err, Some(LoginError::MissingParameter("sig")));

        let only_sig = HashMap::from([("sig".to_string(), "00".to_string())]);
        let err = service
            .complete_login(&challenge.session_id, &only_sig)
            .await
            .err();
        assert_eq!(err, Some(LoginError::MissingParameter("key")));

        assert_eq!(
            status(&store, &challenge.session_id).await?,
            SessionStatus::Pending
        );
        Ok(())
    }

    #[tokio::test]
    async fn malformed_hex_leaves_session_pending() -> Result<()> {
        let (store, service) = service();
        let challenge = service.issue_challenge(PUBLIC_URL).await?;
        let bad = HashMap::from([
            ("sig".to_string(), "not-hex".to_string()),
            ("key".to_string(), "02".to_string()),
        ]);

        let err = service.complete_login(&challenge.session_id, &bad).await.err();
        assert_eq!(err, Some(LoginError::MalformedEncoding("sig")));
        assert_eq!(
            status(&store, &challenge.session_id).await?,
            SessionStatus::Pending
        );
        Ok(())
    }

    #[tokio::test]
    async fn client_supplied_k1_is_not_trusted() -> Result<()> {
        let (store, service) = service();
        let challenge = service.issue_challenge(PUBLIC_URL).await?;
        let wallet = TestWallet::new(11);

        // A signature over a k1 the caller chose, announced alongside it.
        let forged_k1 = [0x42; 32];
        let sig = wallet.sign_der(&forged_k1);
        let mut forged = params(&sig, &wallet.public_key());
        forged.insert("k1".to_string(), hex::encode(forged_k1));

        let err = service
            .complete_login(&challenge.session_id, &forged)
            .await
            .err();
        assert_eq!(err, Some(LoginError::InvalidSignature));
        assert_eq!(
            status(&store, &challenge.session_id).await?,
            SessionStatus::Pending
        );
        Ok(())
    }

    #[tokio::test]
    async fn signature_over_other_secret_is_rejected() -> Result<()> {
        let (store, service) = service();
        let challenge = service.issue_challenge(PUBLIC_URL).await?;
        let wallet = TestWallet::new(11);
        let sig = wallet.sign_der(&[0x42; 32]);

        let err = service
            .complete_login(&challenge.session_id, &params(&sig, &wallet.public_key()))
            .await
            .err();
        assert_eq!(err, Some(LoginError::InvalidSignature));
        assert_eq!(
            status(&store, &challenge.session_id).await?,
            SessionStatus::Pending
        );
        Ok(())
    }

    #[tokio::test]
    async fn signature_from_other_key_is_rejected() -> Result<()> {
        let (_store, service) = service();
        let challenge = service.issue_challenge(PUBLIC_URL).await?;
        let signer = TestWallet::new(11);
        let claimed = TestWallet::new(12);
        let sig = signer.sign_der(&k1_bytes(&challenge.k1)?);

        let err = service
            .complete_login(&challenge.session_id, &params(&sig, &claimed.public_key()))
            .await
            .err();
        assert_eq!(err, Some(LoginError::InvalidSignature));
        Ok(())
    }

    #[tokio::test]
    async fn invalid_key_is_rejected_before_verification() -> Result<()> {
        let (_store, service) = service();
        let challenge = service.issue_challenge(PUBLIC_URL).await?;
        let wallet = TestWallet::new(11);
        let sig = wallet.sign_der(&k1_bytes(&challenge.k1)?);

        let err = service
            .complete_login(&challenge.session_id, &params(&sig, &[0x04; 20]))
            .await
            .err();
        assert_eq!(err, Some(LoginError::InvalidPublicKey));
        assert_eq!(err.map(|e| e.message()).as_deref(), Some("Invalid signature"));
        Ok(())
    }

    #[tokio::test]
    async fn repeated_failures_lock_the_session() -> Result<()> {
        let (store, service) = service();
        let challenge = service.issue_challenge(PUBLIC_URL).await?;
        let wallet = TestWallet::new(11);
        let bad_sig = wallet.sign_der(&[0x42; 32]);

        for _ in 0..3 {
            let err = service
                .complete_login(&challenge.session_id, &params(&bad_sig, &wallet.public_key()))
                .await
                .err();
            assert_eq!(err, Some(LoginError::InvalidSignature));
        }
        assert_eq!(
            status(&store, &challenge.session_id).await?,
            SessionStatus::Expired
        );

        let good_sig = wallet.sign_der(&k1_bytes(&challenge.k1)?);
        let err = service
            .complete_login(&challenge.session_id, &params(&good_sig, &wallet.public_key()))
            .await
            .err();
        assert_eq!(err, Some(LoginError::SessionExpired));
        Ok(())
    }

    #[tokio::test]
    async fn unknown_session_matches_expired_response() -> Result<()> {
        let (_store, service) = service();
        let wallet = TestWallet::new(11);
        let sig = wallet.sign_der(&[0x01; 32]);

        let err = service
            .complete_login("01HZZZZZZZZZZZZZZZZZZZZZZZ", &params(&sig, &wallet.public_key()))
            .await
            .err()
            .context("expected failure")?;
        assert_eq!(err, LoginError::SessionNotFound);
        assert_eq!(err.message(), LoginError::SessionExpired.message());
        assert_eq!(err.status(), LoginError::SessionExpired.status());
        Ok(())
    }

    #[tokio::test]
    async fn verified_session_redelivers_success_for_same_key() -> Result<()> {
        let (store, service) = service();
        let challenge = service.issue_challenge(PUBLIC_URL).await?;
        let wallet = TestWallet::new(11);
        let sig = wallet.sign_der(&k1_bytes(&challenge.k1)?);
        let request = params(&sig, &wallet.public_key());

        service.complete_login(&challenge.session_id, &request).await?;
        service.complete_login(&challenge.session_id, &request).await?;

        assert_eq!(
            status(&store, &challenge.session_id).await?,
            SessionStatus::Verified
        );
        Ok(())
    }

    #[tokio::test]
    async fn verified_session_rejects_other_key() -> Result<()> {
        let (store, service) = service();
        let challenge = service.issue_challenge(PUBLIC_URL).await?;
        let k1 = k1_bytes(&challenge.k1)?;
        let owner = TestWallet::new(11);
        let intruder = TestWallet::new(12);

        service
            .complete_login(
                &challenge.session_id,
                &params(&owner.sign_der(&k1), &owner.public_key()),
            )
            .await?;

        let err = service
            .complete_login(
                &challenge.session_id,
                &params(&intruder.sign_der(&k1), &intruder.public_key()),
            )
            .await
            .err();
        assert_eq!(err, Some(LoginError::SessionExpired));

        let record = store.lookup(&challenge.session_id).await?;
        assert_eq!(record.linking_key, Some(owner.public_key().to_vec()));
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_duplicates_verify_once() -> Result<()> {
        let (store, service) = service();
        let service = Arc::new(service);
        let challenge = service.issue_challenge(PUBLIC_URL).await?;
        let wallet = TestWallet::new(11);
        let request = params(
            &wallet.sign_der(&k1_bytes(&challenge.k1)?),
            &wallet.public_key(),
        );

        let mut handles = Vec::new();
        for _ in 0..8 {
            let service = service.clone();
            let id = challenge.session_id.clone();
            let request = request.clone();
            handles.push(tokio::spawn(async move {
                service.complete_login(&id, &request).await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await?, Ok(()));
        }

        let record = store.lookup(&challenge.session_id).await?;
        assert_eq!(record.status, SessionStatus::Verified);
        assert_eq!(record.linking_key, Some(wallet.public_key().to_vec()));
        Ok(())
    }

    #[tokio::test]
    async fn session_status_consumes_verified_session() -> Result<()> {
        let (_store, service) = service();
        let challenge = service.issue_challenge(PUBLIC_URL).await?;
        let wallet = TestWallet::new(11);

        let pending = service.session_status(&challenge.session_id).await?;
        assert_eq!(pending.status, SessionStatus::Pending);
        assert!(pending.key.is_none());

        service
            .complete_login(
                &challenge.session_id,
                &params(
                    &wallet.sign_der(&k1_bytes(&challenge.k1)?),
                    &wallet.public_key(),
                ),
            )
            .await?;

        let verified = service.session_status(&challenge.session_id).await?;
        assert_eq!(verified.status, SessionStatus::Verified);
        assert_eq!(verified.key, Some(hex::encode(wallet.public_key())));

        let err = service.session_status(&challenge.session_id).await.err();
        assert_eq!(err, Some(LoginError::SessionExpired));
        Ok(())
    }

    struct StalledStore;

    #[async_trait]
    impl SecretStore for StalledStore {
        async fn issue(&self) -> Result<Challenge, StoreError> {
            Err(StoreError::Unavailable("down".to_string()))
        }

        async fn lookup(&self, _session_id: &str) -> Result<SessionRecord, StoreError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Err(StoreError::NotFound)
        }

        async fn transition_to_verified(
            &self,
            _session_id: &str,
            _linking_key: &[u8],
        ) -> Result<Transition, StoreError> {
            Err(StoreError::Unavailable("down".to_string()))
        }

        async fn record_failure(&self, _session_id: &str) -> Result<SessionStatus, StoreError> {
            Err(StoreError::Unavailable("down".to_string()))
        }

        async fn consume(&self, _session_id: &str) -> Result<Vec<u8>, StoreError> {
            Err(StoreError::Unavailable("down".to_string()))
        }
    }

    #[tokio::test]
    async fn store_timeout_is_unavailable() {
        let service = LoginService::new(Arc::new(StalledStore), Duration::from_millis(20));
        let wallet = TestWallet::new(11);
        let request = params(&wallet.sign_der(&[0x01; 32]), &wallet.public_key());

        let err = service.complete_login("01HZX", &request).await.err();
        assert!(matches!(err, Some(LoginError::Unavailable(_))));
        assert_eq!(
            err.map(|e| e.status()),
            Some(axum::http::StatusCode::INTERNAL_SERVER_ERROR)
        );
    }

    #[tokio::test]
    async fn store_failure_on_issue_is_unavailable() {
        let service = LoginService::new(Arc::new(StalledStore), Duration::from_millis(20));
        let err = service.issue_challenge(PUBLIC_URL).await.err();
        assert!(matches!(err, Some(LoginError::Unavailable(_))));
    }
}
