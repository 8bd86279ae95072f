use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    components(
        schemas(axum_helpers::ErrorResponse)
    ),
    info(
        title = "Newsletter API",
        version = "0.1.0",
        description = "Subscribers, templates and campaigns for the Pedal Works newsletter. Admin routes expect a Bearer JWT (or `access_token` cookie) carrying the `admin` role."
    ),
    servers(
        (url = "/api", description = "API base path")
    ),
    nest(
        (path = "/newsletter", api = domain_newsletter::ApiDoc)
    )
)]
pub struct ApiDoc;
