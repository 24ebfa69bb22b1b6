use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use services::{
    AccountApi, ApiError, AppContext, AuthError, AuthService, HealthStatus, InsightApi,
    InsightError, InsightService, PaperApi, PaperError, PaperService, PaperUpload, Registered,
    Registration,
};
use skilltwin_core::model::{
    Dashboard, Identity, LearningPlan, PaperAnalysis, PredictedScore, Prediction, RiskLevel,
    StudentId, StudentProfile, TestRecord,
};
use storage::repository::{InMemoryRepository, ProfileRepository};

fn profile(id: &str) -> StudentProfile {
    StudentProfile {
        id: StudentId::new(id),
        email: "demo@skilltwin.com".into(),
        name: "Demo Student".into(),
        class_level: Some("12th Grade".into()),
        student_id: None,
    }
}

fn context() -> (AppContext, Arc<InMemoryRepository>) {
    let repo = Arc::new(InMemoryRepository::new());
    (AppContext::new(repo.clone()), repo)
}

#[derive(Default)]
struct FakeAccounts {
    calls: AtomicUsize,
    issue_token_on_register: bool,
    reject_login: bool,
}

#[async_trait]
impl AccountApi for FakeAccounts {
    async fn login(&self, email: &str, _password: &str) -> Result<Identity, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.reject_login {
            return Err(ApiError::Unauthorized);
        }
        assert_eq!(email, "demo@skilltwin.com");
        Ok(Identity::new(profile("1"), "jwt-1"))
    }

    async fn register(&self, registration: &Registration) -> Result<Registered, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Registered {
            profile: StudentProfile {
                name: registration.name.clone(),
                ..profile("2")
            },
            token: self.issue_token_on_register.then(|| "jwt-2".to_string()),
        })
    }
}

fn registration(name: &str) -> Registration {
    Registration {
        email: "new@skilltwin.com".into(),
        password: "secret".into(),
        name: name.into(),
        class_level: None,
        school: None,
    }
}

#[tokio::test]
async fn login_stores_identity_and_logout_forgets_it() {
    let api = Arc::new(FakeAccounts::default());
    let (context, repo) = context();
    let auth = AuthService::new(api.clone(), context.clone());

    let identity = auth.login("  demo@skilltwin.com ", "demo123").await.unwrap();
    assert_eq!(identity.token, "jwt-1");
    assert_eq!(context.student_id(), Some(StudentId::new("1")));
    assert_eq!(repo.load_profile().await.unwrap().identity, Some(identity));

    auth.logout().await.unwrap();
    assert!(auth.current().is_none());
    assert_eq!(repo.load_profile().await.unwrap().identity, None);
}

#[tokio::test]
async fn blank_credentials_never_reach_the_service() {
    let api = Arc::new(FakeAccounts::default());
    let (context, _repo) = context();
    let auth = AuthService::new(api.clone(), context);

    assert!(matches!(
        auth.login("   ", "pw").await,
        Err(AuthError::MissingCredentials)
    ));
    assert!(matches!(
        auth.login("demo@skilltwin.com", "").await,
        Err(AuthError::MissingCredentials)
    ));
    assert!(matches!(
        auth.register(registration(" ")).await,
        Err(AuthError::MissingName)
    ));
    assert_eq!(api.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn rejected_login_asks_for_sign_in() {
    let api = Arc::new(FakeAccounts {
        reject_login: true,
        ..FakeAccounts::default()
    });
    let (context, _repo) = context();
    let auth = AuthService::new(api, context.clone());

    let err = auth.login("demo@skilltwin.com", "wrong").await.unwrap_err();
    assert!(err.needs_sign_in());
    assert!(!context.snapshot().is_signed_in());
}

#[tokio::test]
async fn register_signs_in_only_with_a_token() {
    let (context, _repo) = context();
    let auth = AuthService::new(Arc::new(FakeAccounts::default()), context.clone());
    let registered = auth.register(registration("Asha")).await.unwrap();
    assert_eq!(registered.profile.name, "Asha");
    assert!(registered.token.is_none());
    assert!(!context.snapshot().is_signed_in());

    let api = Arc::new(FakeAccounts {
        issue_token_on_register: true,
        ..FakeAccounts::default()
    });
    let auth = AuthService::new(api, context.clone());
    auth.register(registration("Asha")).await.unwrap();
    assert_eq!(context.token().as_deref(), Some("jwt-2"));
    assert_eq!(context.student_id(), Some(StudentId::new("2")));
}

#[derive(Default)]
struct FakeInsights {
    asked_for: Mutex<Vec<StudentId>>,
    degraded: bool,
}

#[async_trait]
impl InsightApi for FakeInsights {
    async fn dashboard(&self, student: &StudentId) -> Result<Dashboard, ApiError> {
        self.asked_for.lock().unwrap().push(student.clone());
        Ok(Dashboard::default())
    }

    async fn prediction(&self, student: &StudentId) -> Result<Prediction, ApiError> {
        self.asked_for.lock().unwrap().push(student.clone());
        Ok(Prediction {
            prediction: PredictedScore {
                predicted_score: 72.0,
                confidence_interval: Some((67.0, 77.0)),
                confidence: Some(85.0),
            },
            risk_level: RiskLevel::Medium,
            weak_topics: Vec::new(),
            recommendations: Vec::new(),
            improvement_tips: Vec::new(),
        })
    }

    async fn test_history(&self, student: &StudentId) -> Result<Vec<TestRecord>, ApiError> {
        self.asked_for.lock().unwrap().push(student.clone());
        Ok(vec![TestRecord {
            id: "t-1".into(),
            subject: "Physics".into(),
            total_score: Some(64.0),
            ..TestRecord::default()
        }])
    }

    async fn recommendations(&self, student: &StudentId) -> Result<LearningPlan, ApiError> {
        self.asked_for.lock().unwrap().push(student.clone());
        Ok(LearningPlan {
            daily_goal: Some("Complete 2 videos and 1 quiz".into()),
            ..LearningPlan::default()
        })
    }

    async fn health(&self) -> Result<HealthStatus, ApiError> {
        Ok(HealthStatus {
            status: if self.degraded { "degraded" } else { "healthy" }.into(),
            version: Some("1.0.0".into()),
            database: None,
            timestamp: None,
        })
    }
}

#[tokio::test]
async fn insights_resolve_the_student() {
    let api = Arc::new(FakeInsights::default());
    let (context, _repo) = context();
    let insights = InsightService::new(api.clone(), context.clone());

    assert!(matches!(
        insights.dashboard(None).await,
        Err(InsightError::NoStudent)
    ));
    assert!(api.asked_for.lock().unwrap().is_empty());

    insights.dashboard(Some(&StudentId::new("9"))).await.unwrap();
    context
        .sign_in(Identity::new(profile("1"), "jwt-1"))
        .await
        .unwrap();
    let prediction = insights.prediction(None).await.unwrap();
    assert_eq!(prediction.risk_level, RiskLevel::Medium);

    assert_eq!(
        *api.asked_for.lock().unwrap(),
        vec![StudentId::new("9"), StudentId::new("1")]
    );
}

#[tokio::test]
async fn history_and_recommendations_follow_the_signed_in_student() {
    let api = Arc::new(FakeInsights::default());
    let (context, _repo) = context();
    let insights = InsightService::new(api.clone(), context.clone());

    assert!(matches!(
        insights.test_history(None).await,
        Err(InsightError::NoStudent)
    ));
    assert!(matches!(
        insights.recommendations(None).await,
        Err(InsightError::NoStudent)
    ));

    context
        .sign_in(Identity::new(profile("1"), "jwt-1"))
        .await
        .unwrap();
    let history = insights.test_history(None).await.unwrap();
    assert_eq!(history[0].total_score, Some(64.0));
    let plan = insights
        .recommendations(Some(&StudentId::new("4")))
        .await
        .unwrap();
    assert!(plan.daily_goal.is_some());

    assert_eq!(
        *api.asked_for.lock().unwrap(),
        vec![StudentId::new("1"), StudentId::new("4")]
    );
}

#[tokio::test]
async fn degraded_health_is_still_reported() {
    let api = Arc::new(FakeInsights {
        degraded: true,
        ..FakeInsights::default()
    });
    let (context, _repo) = context();
    let health = InsightService::new(api, context).health().await.unwrap();
    assert!(!health.is_healthy());
}

#[derive(Default)]
struct FakePapers {
    uploads: Mutex<Vec<PaperUpload>>,
    texts: Mutex<Vec<(String, Option<StudentId>)>>,
}

#[async_trait]
impl PaperApi for FakePapers {
    async fn analyze_paper_file(&self, upload: PaperUpload) -> Result<PaperAnalysis, ApiError> {
        self.uploads.lock().unwrap().push(upload);
        Ok(PaperAnalysis::default())
    }

    async fn analyze_paper_text(
        &self,
        text: &str,
        student: Option<&StudentId>,
    ) -> Result<PaperAnalysis, ApiError> {
        self.texts
            .lock()
            .unwrap()
            .push((text.to_string(), student.cloned()));
        Ok(PaperAnalysis::default())
    }
}

#[tokio::test]
async fn non_pdf_and_empty_files_are_rejected_locally() {
    let dir = tempfile::tempdir().unwrap();
    let notes = dir.path().join("notes.txt");
    std::fs::write(&notes, b"not a paper").unwrap();
    let empty = dir.path().join("empty.pdf");
    std::fs::write(&empty, b"").unwrap();

    let api = Arc::new(FakePapers::default());
    let (context, _repo) = context();
    let papers = PaperService::new(api.clone(), context);

    assert!(matches!(
        papers.analyze_file(&notes).await,
        Err(PaperError::NotPdf(_))
    ));
    assert!(matches!(
        papers.analyze_file(&empty).await,
        Err(PaperError::EmptyFile(_))
    ));
    assert!(matches!(
        papers.analyze_file(&dir.path().join("missing.pdf")).await,
        Err(PaperError::Read { .. })
    ));
    assert!(matches!(
        papers.analyze_text("  \n ").await,
        Err(PaperError::EmptyText)
    ));
    assert!(api.uploads.lock().unwrap().is_empty());
    assert!(api.texts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn pdf_upload_carries_name_and_student() {
    let dir = tempfile::tempdir().unwrap();
    let paper = dir.path().join("Mock-Test.PDF");
    std::fs::write(&paper, b"%PDF-1.4 fake").unwrap();

    let api = Arc::new(FakePapers::default());
    let (context, _repo) = context();
    context
        .sign_in(Identity::new(profile("1"), "jwt-1"))
        .await
        .unwrap();
    let papers = PaperService::new(api.clone(), context);

    papers.analyze_file(&paper).await.unwrap();
    papers.analyze_text("  Q1. Define refraction.  ").await.unwrap();

    let uploads = api.uploads.lock().unwrap();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].file_name, "Mock-Test.PDF");
    assert_eq!(uploads[0].bytes, b"%PDF-1.4 fake".to_vec());
    assert_eq!(uploads[0].student, Some(StudentId::new("1")));

    let texts = api.texts.lock().unwrap();
    assert_eq!(
        texts[0],
        ("Q1. Define refraction.".to_string(), Some(StudentId::new("1")))
    );
}
