use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "statusfeed API",
        version = "0.1.0",
        description = "RSS feed of status page changes."
    ),
    paths(
        crate::routes::status_rss,
        crate::routes::list_feed,
        crate::routes::health,
    ),
    components(schemas(
        crate::dto::FeedEntryResponse,
        crate::dto::FeedResponse,
        crate::dto::HealthResponse,
        crate::dto::ErrorResponse,
    )),
    tags(
        (name = "feed", description = "Status change feed"),
        (name = "system", description = "Health and system status"),
    )
)]
pub struct ApiDoc;
