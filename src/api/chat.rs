use actix_web::{web, HttpResponse, ResponseError};

use crate::config::AppConfig;
use crate::services::chat_service::{self, ChatRequest, ChatResponse};

#[utoipa::path(
    post,
    path = "/chat",
    tag = "External",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Assistant reply", body = ChatResponse),
        (status = 400, description = "Message is required"),
        (status = 502, description = "Chat API unavailable")
    )
)]
pub async fn chat(config: web::Data<AppConfig>, request: web::Json<ChatRequest>) -> HttpResponse {
    log::info!("💬 POST /chat");

    let message = match chat_service::validate_message(&request) {
        Ok(message) => message,
        Err(e) => return e.error_response(),
    };

    match chat_service::ask_assistant(&config.chat, &message).await {
        Ok(reply) => HttpResponse::Ok().json(ChatResponse { success: true, reply }),
        Err(e) => {
            log::error!("❌ Chatbot error: {}", e);
            e.error_response()
        }
    }
}
