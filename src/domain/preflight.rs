use rand::Rng;
use std::collections::BTreeMap;

use crate::error::SessionError;
use crate::state::entities::EnemyId;
use crate::state::room::EnemySnapshot;
use crate::state::session::SessionState;
use crate::utils::config::Tuning;

/// Host environment a session starts in: UI lookup and model loading
pub trait Collaborators {
    fn has_ui_element(&self, id: &str) -> bool;

    /// Load a 3D model; `Err` carries a human-readable reason
    fn load_model(&mut self, url: &str) -> Result<(), String>;
}

/// Start-up requirements checked before any session state is built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preflight {
    pub required_ui: Vec<String>,
    pub models: Vec<String>,
}

impl Default for Preflight {
    fn default() -> Self {
        Self {
            required_ui: [
                "playerHealthBar",
                "ammoDisplay",
                "enemyHealthBars",
                "crosshair",
                "overlay",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            models: vec!["models/weapon.glb".to_string(), "models/enemy.glb".to_string()],
        }
    }
}

impl Preflight {
    /// Every missing UI element is reported together; models load only
    /// once the UI is complete, stopping at the first failure.
    pub fn run<C: Collaborators + ?Sized>(&self, env: &mut C) -> Result<(), SessionError> {
        let missing: Vec<String> = self
            .required_ui
            .iter()
            .filter(|id| !env.has_ui_element(id))
            .cloned()
            .collect();
        if !missing.is_empty() {
            log::error!("Missing UI elements: {:?}", missing);
            return Err(SessionError::MissingUi(missing));
        }

        for url in &self.models {
            env.load_model(url).map_err(|reason| {
                log::error!("Failed to load model {}: {}", url, reason);
                SessionError::AssetLoad {
                    url: url.clone(),
                    reason,
                }
            })?;
            log::debug!("Loaded model {}", url);
        }

        Ok(())
    }

    /// Check the environment, then build a locally generated session
    pub fn start_single_player<C, R>(&self, env: &mut C, tuning: Tuning, rng: &mut R) -> Result<SessionState, SessionError>
    where
        C: Collaborators + ?Sized,
        R: Rng + ?Sized,
    {
        self.run(env)?;
        SessionState::new_single_player(tuning, rng)
    }

    /// Check the environment, then build a session from what the host published
    pub fn join_published<C: Collaborators + ?Sized>(
        &self,
        env: &mut C,
        tuning: Tuning,
        maze_rows: Option<&[String]>,
        enemies: &BTreeMap<EnemyId, EnemySnapshot>,
    ) -> Result<SessionState, SessionError> {
        self.run(env)?;
        SessionState::from_published(tuning, maze_rows, enemies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    struct FakeEnv {
        ui: HashSet<String>,
        broken_model: Option<String>,
        loaded: Vec<String>,
    }

    impl FakeEnv {
        fn complete() -> Self {
            Self {
                ui: Preflight::default().required_ui.into_iter().collect(),
                broken_model: None,
                loaded: Vec::new(),
            }
        }
    }

    impl Collaborators for FakeEnv {
        fn has_ui_element(&self, id: &str) -> bool {
            self.ui.contains(id)
        }

        fn load_model(&mut self, url: &str) -> Result<(), String> {
            if self.broken_model.as_deref() == Some(url) {
                return Err("404".to_string());
            }
            self.loaded.push(url.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_preflight_passes() {
        let mut env = FakeEnv::complete();
        assert!(Preflight::default().run(&mut env).is_ok());
        assert_eq!(env.loaded.len(), 2);
    }

    #[test]
    fn test_missing_ui_reported_before_loading() {
        let mut env = FakeEnv::complete();
        env.ui.remove("crosshair");
        env.ui.remove("overlay");

        let err = Preflight::default().run(&mut env).unwrap_err();
        match err {
            SessionError::MissingUi(missing) => assert_eq!(missing, vec!["crosshair", "overlay"]),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(env.loaded.is_empty());
    }

    #[test]
    fn test_model_failure_is_fatal() {
        let mut env = FakeEnv::complete();
        env.broken_model = Some("models/weapon.glb".to_string());

        let err = Preflight::default().run(&mut env).unwrap_err();
        assert!(matches!(err, SessionError::AssetLoad { ref url, .. } if url == "models/weapon.glb"));
        assert!(env.loaded.is_empty());
    }

    #[test]
    fn test_session_built_only_after_preflight() {
        let mut env = FakeEnv::complete();
        env.ui.remove("ammoDisplay");
        let err = Preflight::default()
            .start_single_player(&mut env, Tuning::default(), &mut StdRng::seed_from_u64(1))
            .unwrap_err();
        assert!(matches!(err, SessionError::MissingUi(_)));

        let mut env = FakeEnv::complete();
        let session = Preflight::default()
            .start_single_player(&mut env, Tuning::default(), &mut StdRng::seed_from_u64(1))
            .unwrap();
        assert!(session.host_authority);
        assert_eq!(env.loaded.len(), 2);
    }

    #[test]
    fn test_join_published_checks_models_first() {
        let rows: Vec<String> = ["###", "#..", "###"].into_iter().map(String::from).collect();
        let mut env = FakeEnv::complete();
        env.broken_model = Some("models/enemy.glb".to_string());

        let err = Preflight::default()
            .join_published(&mut env, Tuning::default(), Some(&rows), &BTreeMap::new())
            .unwrap_err();
        assert!(matches!(err, SessionError::AssetLoad { .. }));

        env.broken_model = None;
        let session = Preflight::default()
            .join_published(&mut env, Tuning::default(), Some(&rows), &BTreeMap::new())
            .unwrap();
        assert!(!session.host_authority);
    }
}
