#[cfg(test)]
mod tests {
    use rocket::http::{ContentType, Status};
    use serde_json::{Value, json};

    use crate::auth::Role;
    use crate::db::DUPLICATE_FITNESS_PLAN;
    use crate::models::{FitnessPlan, PlanStatus};
    use crate::test::utils::{
        TestDb, TestDbBuilder, bearer, fitness_plan_input, login_test_user, setup_test_client,
    };
    use crate::validation::ValidationResponse;

    async fn plans_db() -> TestDb {
        TestDbBuilder::new()
            .user("user@example.com", "Regular User")
            .with_role("planner@example.com", "Planner", Role::Planner)
            .with_role("fit@example.com", "Fitness Admin", Role::AdminFitness)
            .with_role("food@example.com", "Nutrition Admin", Role::AdminNutritionist)
            .fitness_plan("Strength Starter", "Strength Training", PlanStatus::Published)
            .fitness_plan("Morning Yoga", "Yoga", PlanStatus::Published)
            .fitness_plan("Secret HIIT", "HIIT", PlanStatus::Draft)
            .build()
            .await
            .unwrap()
    }

    #[rocket::async_test]
    async fn test_public_list_only_shows_published() {
        let test_db = plans_db().await;
        let client = setup_test_client(&test_db).await;

        let response = client.get("/api/fitness-plans").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        let plans: Vec<FitnessPlan> = response.into_json().await.unwrap();

        let titles: Vec<&str> = plans.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Morning Yoga", "Strength Starter"]);
        assert!(plans.iter().all(|p| p.status == PlanStatus::Published));
    }

    #[rocket::async_test]
    async fn test_public_list_filters_by_category() {
        let test_db = plans_db().await;
        let client = setup_test_client(&test_db).await;

        let response = client
            .get("/api/fitness-plans?category=yoga")
            .dispatch()
            .await;
        let plans: Vec<FitnessPlan> = response.into_json().await.unwrap();
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].title, "Morning Yoga");

        let response = client
            .get("/api/fitness-plans?category=HIIT")
            .dispatch()
            .await;
        let plans: Vec<FitnessPlan> = response.into_json().await.unwrap();
        assert!(plans.is_empty());
    }

    #[rocket::async_test]
    async fn test_draft_detail_visibility() {
        let test_db = plans_db().await;
        let client = setup_test_client(&test_db).await;
        let draft_url = format!("/api/fitness-plans/{}", test_db.plan_id("Secret HIIT"));

        let response = client.get(&draft_url).dispatch().await;
        assert_eq!(response.status(), Status::NotFound);

        let token = login_test_user(&client, "user@example.com").await;
        let response = client.get(&draft_url).header(bearer(&token)).dispatch().await;
        assert_eq!(response.status(), Status::NotFound);

        for email in ["planner@example.com", "fit@example.com"] {
            let token = login_test_user(&client, email).await;
            let response = client.get(&draft_url).header(bearer(&token)).dispatch().await;
            assert_eq!(response.status(), Status::Ok, "{} should see drafts", email);
        }

        let published_url = format!("/api/fitness-plans/{}", test_db.plan_id("Morning Yoga"));
        let response = client.get(&published_url).dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        let plan: FitnessPlan = response.into_json().await.unwrap();
        assert_eq!(plan.schedule[0].exercises[0].name, "Goblet Squat");
    }

    #[rocket::async_test]
    async fn test_admin_routes_require_fitness_permission() {
        let test_db = plans_db().await;
        let client = setup_test_client(&test_db).await;

        let response = client.get("/api/admin/fitness-plans").dispatch().await;
        assert_eq!(response.status(), Status::Unauthorized);

        for email in ["user@example.com", "planner@example.com", "food@example.com"] {
            let token = login_test_user(&client, email).await;
            let response = client
                .get("/api/admin/fitness-plans")
                .header(bearer(&token))
                .dispatch()
                .await;
            assert_eq!(response.status(), Status::Forbidden, "{} got through", email);
            let body: ValidationResponse = response.into_json().await.unwrap();
            assert!(body.errors.contains_key("permission"));
        }

        let token = login_test_user(&client, "fit@example.com").await;
        let response = client
            .get("/api/admin/fitness-plans")
            .header(bearer(&token))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let plans: Vec<FitnessPlan> = response.into_json().await.unwrap();
        assert_eq!(plans.len(), 3);
    }

    #[rocket::async_test]
    async fn test_create_plan_records_author() {
        let test_db = plans_db().await;
        let client = setup_test_client(&test_db).await;
        let token = login_test_user(&client, "fit@example.com").await;

        let input = fitness_plan_input("Cardio Base", "Cardio", PlanStatus::Draft);
        let response = client
            .post("/api/admin/fitness-plans")
            .header(bearer(&token))
            .header(ContentType::JSON)
            .body(serde_json::to_string(&input).unwrap())
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Created);
        let plan: FitnessPlan = response.into_json().await.unwrap();
        assert_eq!(plan.title, "Cardio Base");
        assert_eq!(plan.status, PlanStatus::Draft);
        assert_eq!(plan.created_by, Some(test_db.user_id("fit@example.com")));
        assert_eq!(plan.equipment, vec!["Dumbbells".to_string()]);
    }

    #[rocket::async_test]
    async fn test_create_plan_reports_each_invalid_field() {
        let test_db = plans_db().await;
        let client = setup_test_client(&test_db).await;
        let token = login_test_user(&client, "fit@example.com").await;

        let response = client
            .post("/api/admin/fitness-plans")
            .header(bearer(&token))
            .header(ContentType::JSON)
            .body(
                json!({
                    "title": "",
                    "description": "  ",
                    "category": "Cardio",
                    "level": "Beginner",
                    "difficulty": 9
                })
                .to_string(),
            )
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::UnprocessableEntity);
        let body: ValidationResponse = response.into_json().await.unwrap();
        assert!(body.errors.contains_key("title"));
        assert!(body.errors.contains_key("description"));
        assert_eq!(
            body.first_message("difficulty"),
            Some("Difficulty must be between 1 and 5")
        );
        assert!(!body.errors.contains_key("category"));

        let response = client
            .get("/api/admin/fitness-plans")
            .header(bearer(&token))
            .dispatch()
            .await;
        let plans: Vec<FitnessPlan> = response.into_json().await.unwrap();
        assert_eq!(plans.len(), 3, "nothing should be written");
    }

    #[rocket::async_test]
    async fn test_blank_category_and_level_are_rejected() {
        let test_db = plans_db().await;
        let client = setup_test_client(&test_db).await;
        let token = login_test_user(&client, "fit@example.com").await;

        let mut input = fitness_plan_input("Cardio Base", "   ", PlanStatus::Draft);
        input.level = String::new();
        let response = client
            .post("/api/admin/fitness-plans")
            .header(bearer(&token))
            .header(ContentType::JSON)
            .body(serde_json::to_string(&input).unwrap())
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::UnprocessableEntity);
        let body: ValidationResponse = response.into_json().await.unwrap();
        assert!(body.errors.contains_key("category"));
        assert!(body.errors.contains_key("level"));
        assert!(!body.errors.contains_key("title"));

        let response = client
            .get("/api/admin/fitness-plans")
            .header(bearer(&token))
            .dispatch()
            .await;
        let plans: Vec<FitnessPlan> = response.into_json().await.unwrap();
        assert_eq!(plans.len(), 3);
        assert!(plans.iter().all(|plan| plan.title != "Cardio Base"));
    }

    #[rocket::async_test]
    async fn test_duplicate_plan_conflicts() {
        let test_db = plans_db().await;
        let client = setup_test_client(&test_db).await;
        let token = login_test_user(&client, "fit@example.com").await;

        let duplicate =
            fitness_plan_input("Strength Starter", "Strength Training", PlanStatus::Draft);
        let response = client
            .post("/api/admin/fitness-plans")
            .header(bearer(&token))
            .header(ContentType::JSON)
            .body(serde_json::to_string(&duplicate).unwrap())
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Conflict);
        let body: ValidationResponse = response.into_json().await.unwrap();
        assert_eq!(body.first_message("resource"), Some(DUPLICATE_FITNESS_PLAN));
    }

    #[rocket::async_test]
    async fn test_publish_update_and_delete() {
        let test_db = plans_db().await;
        let client = setup_test_client(&test_db).await;
        let token = login_test_user(&client, "fit@example.com").await;
        let draft_id = test_db.plan_id("Secret HIIT");

        let response = client
            .put(format!("/api/admin/fitness-plans/{}/status", draft_id))
            .header(bearer(&token))
            .header(ContentType::JSON)
            .body(json!({ "status": "published" }).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);

        let response = client.get("/api/fitness-plans").dispatch().await;
        let plans: Vec<FitnessPlan> = response.into_json().await.unwrap();
        assert_eq!(plans.len(), 3);

        let mut input = fitness_plan_input("Secret HIIT", "HIIT", PlanStatus::Published);
        input.weekly_workouts = 5;
        let response = client
            .put(format!("/api/admin/fitness-plans/{}", draft_id))
            .header(bearer(&token))
            .header(ContentType::JSON)
            .body(serde_json::to_string(&input).unwrap())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let plan: FitnessPlan = response.into_json().await.unwrap();
        assert_eq!(plan.weekly_workouts, 5);

        let response = client
            .delete(format!("/api/admin/fitness-plans/{}", draft_id))
            .header(bearer(&token))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::NoContent);

        let response = client
            .get(format!("/api/fitness-plans/{}", draft_id))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::NotFound);

        let response = client
            .delete(format!("/api/admin/fitness-plans/{}", draft_id))
            .header(bearer(&token))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::NotFound);
    }

    #[rocket::async_test]
    async fn test_unknown_status_is_rejected() {
        let test_db = plans_db().await;
        let client = setup_test_client(&test_db).await;
        let token = login_test_user(&client, "fit@example.com").await;

        let response = client
            .put(format!(
                "/api/admin/fitness-plans/{}/status",
                test_db.plan_id("Secret HIIT")
            ))
            .header(bearer(&token))
            .header(ContentType::JSON)
            .body(json!({ "status": "archived" }).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::UnprocessableEntity);

        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["status"], "error");
    }
}
