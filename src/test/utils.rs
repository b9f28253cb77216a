use std::collections::HashMap;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use rocket::http::{ContentType, Header, Status};
use rocket::local::asynchronous::Client;
use serde_json::{Value, json};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};

use crate::auth::{RetryPolicy, Role};
use crate::config::AppConfig;
use crate::db::{create_account, create_fitness_plan, create_nutrition_plan, create_profile};
use crate::error::AppError;
use crate::init_rocket;
use crate::mailer::{DisabledEmailSender, EmailMessage, EmailSender};
use crate::models::{
    Exercise, FitnessPlanInput, NewProfile, NutritionPlanInput, PlanStatus, ScheduleDay,
};

static INIT: Once = Once::new();
pub static STANDARD_PASSWORD: &str = "password123";

pub struct TestUser {
    pub email: String,
    pub full_name: String,
    pub role: Role,
}

pub struct TestPlan {
    pub title: String,
    pub category: String,
    pub status: PlanStatus,
}

#[derive(Default)]
pub struct TestDbBuilder {
    users: Vec<TestUser>,
    fitness_plans: Vec<TestPlan>,
    nutrition_plans: Vec<TestPlan>,
}

impl TestDbBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user(self, email: &str, full_name: &str) -> Self {
        self.with_role(email, full_name, Role::User)
    }

    pub fn super_admin(self, email: &str, full_name: &str) -> Self {
        self.with_role(email, full_name, Role::AdminSuper)
    }

    pub fn with_role(mut self, email: &str, full_name: &str, role: Role) -> Self {
        self.users.push(TestUser {
            email: email.to_string(),
            full_name: full_name.to_string(),
            role,
        });
        self
    }

    pub fn fitness_plan(mut self, title: &str, category: &str, status: PlanStatus) -> Self {
        self.fitness_plans.push(TestPlan {
            title: title.to_string(),
            category: category.to_string(),
            status,
        });
        self
    }

    pub fn nutrition_plan(mut self, title: &str, category: &str, status: PlanStatus) -> Self {
        self.nutrition_plans.push(TestPlan {
            title: title.to_string(),
            category: category.to_string(),
            status,
        });
        self
    }

    pub async fn build(self) -> Result<TestDb, AppError> {
        INIT.call_once(|| {
            let _ = tracing_subscriber::fmt()
                .with_env_filter("fitness_hub=debug")
                .with_test_writer()
                .try_init();
        });

        // A single long-lived connection keeps the in-memory database alive.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        crate::db::run_migrations(&pool).await?;

        let mut user_id_map = HashMap::new();
        for user in &self.users {
            let id = create_account(&pool, &user.email, STANDARD_PASSWORD, &user.full_name).await?;
            create_profile(
                &pool,
                &NewProfile {
                    id,
                    full_name: user.full_name.clone(),
                    email: user.email.clone(),
                    role: user.role,
                },
            )
            .await?;
            user_id_map.insert(user.email.clone(), id);
        }

        let mut plan_id_map = HashMap::new();
        for plan in &self.fitness_plans {
            let created = create_fitness_plan(
                &pool,
                &fitness_plan_input(&plan.title, &plan.category, plan.status),
                None,
            )
            .await?;
            plan_id_map.insert(plan.title.clone(), created.id);
        }
        for plan in &self.nutrition_plans {
            let created = create_nutrition_plan(
                &pool,
                &nutrition_plan_input(&plan.title, &plan.category, plan.status),
                None,
            )
            .await?;
            plan_id_map.insert(plan.title.clone(), created.id);
        }

        Ok(TestDb {
            pool,
            user_id_map,
            plan_id_map,
        })
    }
}

pub struct TestDb {
    pub pool: Pool<Sqlite>,
    pub user_id_map: HashMap<String, i64>,
    pub plan_id_map: HashMap<String, i64>,
}

impl TestDb {
    pub fn user_id(&self, email: &str) -> i64 {
        self.user_id_map[email]
    }

    pub fn plan_id(&self, title: &str) -> i64 {
        self.plan_id_map[title]
    }
}

pub fn fitness_plan_input(title: &str, category: &str, status: PlanStatus) -> FitnessPlanInput {
    FitnessPlanInput {
        title: title.to_string(),
        description: format!("{} for every week", title),
        category: category.to_string(),
        level: "Beginner".to_string(),
        duration: "4 weeks".to_string(),
        weekly_workouts: 3,
        difficulty: 2,
        prerequisites: vec![],
        equipment: vec!["Dumbbells".to_string()],
        goals: vec!["Get stronger".to_string()],
        schedule: vec![ScheduleDay {
            day: "Day 1".to_string(),
            focus: "Full body".to_string(),
            exercises: vec![Exercise {
                name: "Goblet Squat".to_string(),
                sets: Some(3),
                reps: Some("12".to_string()),
                ..Default::default()
            }],
        }],
        status,
    }
}

pub fn nutrition_plan_input(title: &str, category: &str, status: PlanStatus) -> NutritionPlanInput {
    NutritionPlanInput {
        title: title.to_string(),
        description: format!("{} meals", title),
        category: category.to_string(),
        calories_per_day: Some(2000),
        meals_per_day: 3,
        dietary_tags: vec!["high-protein".to_string()],
        meal_plan: vec![],
        status,
    }
}

/// Keeps every message instead of talking to a provider.
#[derive(Default)]
pub struct RecordingEmailSender {
    pub sent: Mutex<Vec<EmailMessage>>,
}

impl RecordingEmailSender {
    pub fn messages(&self) -> Vec<EmailMessage> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

#[rocket::async_trait]
impl EmailSender for RecordingEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<(), AppError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(message.clone());
        }
        Ok(())
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".to_string(),
        profile_retry: RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
        },
        ..Default::default()
    }
}

pub async fn setup_test_client_with_mailer(
    test_db: &TestDb,
    mailer: Arc<dyn EmailSender>,
) -> Client {
    let rocket = init_rocket(test_db.pool.clone(), test_config(), mailer);
    Client::untracked(rocket)
        .await
        .expect("valid rocket instance")
}

pub async fn setup_test_client(test_db: &TestDb) -> Client {
    setup_test_client_with_mailer(test_db, Arc::new(DisabledEmailSender)).await
}

/// Logs in through the API and returns the bearer token.
pub async fn login_test_user(client: &Client, email: &str) -> String {
    let response = client
        .post("/api/auth/login")
        .header(ContentType::JSON)
        .body(
            json!({
                "email": email,
                "password": STANDARD_PASSWORD
            })
            .to_string(),
        )
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Ok, "login failed for {}", email);

    let body: Value = response.into_json().await.expect("login response body");
    body["token"]
        .as_str()
        .expect("token in login response")
        .to_string()
}

pub fn bearer(token: &str) -> Header<'static> {
    Header::new("Authorization", format!("Bearer {}", token))
}
