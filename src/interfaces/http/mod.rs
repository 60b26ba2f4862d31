use crate::application::{FineTuneService, TrainingFileExporter};
use crate::domain::error::AppError;
use crate::domain::model_config::{ModelConfigInput, ModelConfigPatch};
use crate::domain::training_example::{TrainingExampleInput, TrainingExamplePatch};
use crate::infrastructure::db::connection::Database;
use crate::infrastructure::db::repositories::{ModelConfigRepository, TrainingExampleRepository};
use crate::infrastructure::openai::FineTuneProvider;
use actix_cors::Cors;
use actix_web::dev::{Payload, Server};
use actix_web::{
    delete, get, patch, post, put, web, App, FromRequest, HttpRequest, HttpResponse, HttpServer,
    Responder,
};
use serde_json::json;
use std::future::{ready, Ready};
use std::sync::Arc;
use tracing::error;

pub struct AppState {
    pub model_configs: ModelConfigRepository,
    pub training_examples: TrainingExampleRepository,
    pub exporter: Arc<TrainingFileExporter>,
    pub fine_tune: FineTuneService,
    pub auth_token: String,
}

impl AppState {
    pub fn new(
        db: &Database,
        exporter: Arc<TrainingFileExporter>,
        provider: Arc<dyn FineTuneProvider + Send + Sync>,
        auth_token: impl Into<String>,
    ) -> Self {
        Self {
            model_configs: ModelConfigRepository::new(db),
            training_examples: TrainingExampleRepository::new(db),
            exporter: exporter.clone(),
            fine_tune: FineTuneService::new(db, exporter, provider),
            auth_token: auth_token.into(),
        }
    }
}

fn error_response(err: &AppError) -> HttpResponse {
    let body = json!({ "error": err.to_string() });
    match err {
        AppError::NotFound(_) => HttpResponse::NotFound().json(body),
        AppError::ValidationError(_) => HttpResponse::BadRequest().json(body),
        AppError::Unauthorized(_) => HttpResponse::Unauthorized().json(body),
        _ => {
            error!(error = %err, "Request failed");
            HttpResponse::InternalServerError().json(body)
        }
    }
}

/// Marker extracted from the bearer token; every endpoint requires it.
pub struct AuthenticatedUser;

impl FromRequest for AuthenticatedUser {
    type Error = actix_web::Error;
    type Future = Ready<std::result::Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let expected = req
            .app_data::<web::Data<AppState>>()
            .map(|state| state.auth_token.clone());

        let provided = req
            .headers()
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));

        let authorized = matches!((expected.as_deref(), provided), (Some(e), Some(p)) if !e.is_empty() && e == p);

        ready(if authorized {
            Ok(AuthenticatedUser)
        } else {
            Err(actix_web::error::InternalError::from_response(
                "unauthorized",
                error_response(&AppError::Unauthorized(
                    "Missing or invalid bearer token".to_string(),
                )),
            )
            .into())
        })
    }
}

// --- ModelConfig CRUD ---

#[get("/fine_tuned_models")]
async fn list_model_configs(data: web::Data<AppState>, _user: AuthenticatedUser) -> impl Responder {
    match data.model_configs.list_all().await {
        Ok(configs) => HttpResponse::Ok().json(configs),
        Err(e) => error_response(&e),
    }
}

#[post("/fine_tuned_models")]
async fn create_model_config(
    data: web::Data<AppState>,
    _user: AuthenticatedUser,
    input: web::Json<ModelConfigInput>,
) -> impl Responder {
    match data.model_configs.insert(&input).await {
        Ok(config) => HttpResponse::Created().json(config),
        Err(e) => error_response(&e),
    }
}

#[get("/fine_tuned_models/{id}")]
async fn get_model_config(
    data: web::Data<AppState>,
    _user: AuthenticatedUser,
    path: web::Path<i64>,
) -> impl Responder {
    match data.model_configs.get(path.into_inner()).await {
        Ok(config) => HttpResponse::Ok().json(config),
        Err(e) => error_response(&e),
    }
}

#[put("/fine_tuned_models/{id}")]
async fn update_model_config(
    data: web::Data<AppState>,
    _user: AuthenticatedUser,
    path: web::Path<i64>,
    input: web::Json<ModelConfigInput>,
) -> impl Responder {
    match data.model_configs.update(path.into_inner(), &input).await {
        Ok(config) => HttpResponse::Ok().json(config),
        Err(e) => error_response(&e),
    }
}

#[patch("/fine_tuned_models/{id}")]
async fn patch_model_config(
    data: web::Data<AppState>,
    _user: AuthenticatedUser,
    path: web::Path<i64>,
    input: web::Json<ModelConfigPatch>,
) -> impl Responder {
    match data.model_configs.patch(path.into_inner(), &input).await {
        Ok(config) => HttpResponse::Ok().json(config),
        Err(e) => error_response(&e),
    }
}

#[delete("/fine_tuned_models/{id}")]
async fn delete_model_config(
    data: web::Data<AppState>,
    _user: AuthenticatedUser,
    path: web::Path<i64>,
) -> impl Responder {
    match data.model_configs.delete(path.into_inner()).await {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(e) => error_response(&e),
    }
}

// --- TrainingExample CRUD ---

#[get("/training_data")]
async fn list_training_examples(
    data: web::Data<AppState>,
    _user: AuthenticatedUser,
) -> impl Responder {
    match data.training_examples.list_all().await {
        Ok(examples) => HttpResponse::Ok().json(examples),
        Err(e) => error_response(&e),
    }
}

#[post("/training_data")]
async fn create_training_example(
    data: web::Data<AppState>,
    _user: AuthenticatedUser,
    input: web::Json<TrainingExampleInput>,
) -> impl Responder {
    match data.training_examples.insert(&input).await {
        Ok(example) => HttpResponse::Created().json(example),
        Err(e) => error_response(&e),
    }
}

#[get("/training_data/{id}")]
async fn get_training_example(
    data: web::Data<AppState>,
    _user: AuthenticatedUser,
    path: web::Path<i64>,
) -> impl Responder {
    match data.training_examples.get(path.into_inner()).await {
        Ok(example) => HttpResponse::Ok().json(example),
        Err(e) => error_response(&e),
    }
}

#[put("/training_data/{id}")]
async fn update_training_example(
    data: web::Data<AppState>,
    _user: AuthenticatedUser,
    path: web::Path<i64>,
    input: web::Json<TrainingExampleInput>,
) -> impl Responder {
    match data.training_examples.update(path.into_inner(), &input).await {
        Ok(example) => HttpResponse::Ok().json(example),
        Err(e) => error_response(&e),
    }
}

#[patch("/training_data/{id}")]
async fn patch_training_example(
    data: web::Data<AppState>,
    _user: AuthenticatedUser,
    path: web::Path<i64>,
    input: web::Json<TrainingExamplePatch>,
) -> impl Responder {
    match data.training_examples.patch(path.into_inner(), &input).await {
        Ok(example) => HttpResponse::Ok().json(example),
        Err(e) => error_response(&e),
    }
}

#[delete("/training_data/{id}")]
async fn delete_training_example(
    data: web::Data<AppState>,
    _user: AuthenticatedUser,
    path: web::Path<i64>,
) -> impl Responder {
    match data.training_examples.delete(path.into_inner()).await {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(e) => error_response(&e),
    }
}

// --- Fine-tune actions ---

#[get("/openai/convert/{id}")]
async fn convert_training_file(
    data: web::Data<AppState>,
    _user: AuthenticatedUser,
    path: web::Path<i64>,
) -> impl Responder {
    match data.exporter.export(path.into_inner()).await {
        Ok(summary) => HttpResponse::Ok().json(summary),
        Err(e) => error_response(&e),
    }
}

#[post("/openai/upload/{id}")]
async fn upload_training_file(
    data: web::Data<AppState>,
    _user: AuthenticatedUser,
    path: web::Path<i64>,
) -> impl Responder {
    match data.fine_tune.upload_training_file(path.into_inner()).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => error_response(&e),
    }
}

#[post("/openai/create/{id}")]
async fn create_fine_tune(
    data: web::Data<AppState>,
    _user: AuthenticatedUser,
    path: web::Path<i64>,
) -> impl Responder {
    match data.fine_tune.create_fine_tune(path.into_inner()).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => error_response(&e),
    }
}

#[put("/openai/retrieve/{id}")]
async fn retrieve_fine_tune(
    data: web::Data<AppState>,
    _user: AuthenticatedUser,
    path: web::Path<i64>,
) -> impl Responder {
    match data.fine_tune.retrieve_fine_tune(path.into_inner()).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => error_response(&e),
    }
}

pub fn api_scope() -> actix_web::Scope {
    web::scope("/api")
        .service(list_model_configs)
        .service(create_model_config)
        .service(get_model_config)
        .service(update_model_config)
        .service(patch_model_config)
        .service(delete_model_config)
        .service(list_training_examples)
        .service(create_training_example)
        .service(get_training_example)
        .service(update_training_example)
        .service(patch_training_example)
        .service(delete_training_example)
        .service(convert_training_file)
        .service(upload_training_file)
        .service(create_fine_tune)
        .service(retrieve_fine_tune)
}

pub fn start_server(state: Arc<AppState>, host: &str, port: u16) -> std::io::Result<Server> {
    let state = web::Data::from(state);

    let server = HttpServer::new(move || {
        let cors = Cors::permissive(); // Admin backend for a trusted frontend

        App::new()
            .wrap(cors)
            .app_data(state.clone())
            .service(api_scope())
    })
    .bind((host, port))?
    .run();

    Ok(server)
}
