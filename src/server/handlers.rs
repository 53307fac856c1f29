//! Request handlers
//!
//! Thin adapters from HTTP to [`Publisher`](crate::core::Publisher) calls.

use axum::{
    extract::{multipart::Field, Multipart, Path, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::Serialize;

use super::extractors::{ChannelId, PodcastId};
use super::response::{ApiError, ApiResult, Created, NoContent};
use super::state::AppState;
use crate::core::{ChannelView, Overview, PendingUpload, Publisher, UpdateReply};
use crate::domain::{Channel, ChannelUpdateBody, Podcast, PodcastUpdate};

pub const RSS_CONTENT_TYPE: &str = "application/rss+xml; charset=utf-8";

pub const ROBOTS_TXT: &str = "User-agent: *\nDisallow: /\n";

/// Reply to a cover upload
#[derive(Debug, Serialize)]
pub struct CoverReply {
    pub cover: String,
}

/// Public feed of a channel
///
/// GET /feed/:alias
pub async fn feed(
    State(state): State<AppState>,
    Path(alias): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let xml = state.publisher().feed(&alias).await?;
    Ok(([(header::CONTENT_TYPE, RSS_CONTENT_TYPE)], xml))
}

/// GET /robots.txt
pub async fn robots() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain")], ROBOTS_TXT)
}

/// GET /api/list
pub async fn list_channels(State(state): State<AppState>) -> ApiResult<Json<Vec<Channel>>> {
    Ok(Json(state.publisher().list_channels().await?))
}

/// POST /api/channel
pub async fn create_channel(
    State(state): State<AppState>,
) -> ApiResult<Created<Json<ChannelView>>> {
    let channel = state.publisher().create_channel().await?;
    Ok(Created(Json(channel)))
}

/// GET /api/channel/:channel
pub async fn overview(
    State(state): State<AppState>,
    ChannelId(channel): ChannelId,
) -> ApiResult<Json<Overview>> {
    Ok(Json(state.publisher().overview(channel).await?))
}

/// PUT /api/channel/:channel
pub async fn update_channel(
    State(state): State<AppState>,
    ChannelId(channel): ChannelId,
    Json(body): Json<ChannelUpdateBody>,
) -> ApiResult<Json<UpdateReply>> {
    let reply = state
        .publisher()
        .update_channel(channel, body.into_update())
        .await?;
    Ok(Json(reply))
}

/// DELETE /api/channel/:channel
pub async fn delete_channel(
    State(state): State<AppState>,
    ChannelId(channel): ChannelId,
) -> ApiResult<NoContent> {
    state.publisher().delete_channel(channel).await?;
    Ok(NoContent)
}

/// Upload an episode: multipart `file` plus its byte count in `length`
///
/// POST /api/channel/:channel/upload
pub async fn upload_podcast(
    State(state): State<AppState>,
    ChannelId(channel): ChannelId,
    mut multipart: Multipart,
) -> ApiResult<Created<Json<Podcast>>> {
    let publisher = state.publisher();
    let mut form = UploadForm::default();

    let read = read_upload_form(publisher, channel, &mut multipart, &mut form, false).await;
    let upload = settle(publisher, read, form.upload).await?;

    let podcast = publisher.finish_upload(upload, form.length.trim()).await?;
    Ok(Created(Json(podcast)))
}

/// POST /api/channel/:channel/cover/upload
pub async fn upload_cover(
    State(state): State<AppState>,
    ChannelId(channel): ChannelId,
    mut multipart: Multipart,
) -> ApiResult<Json<CoverReply>> {
    let publisher = state.publisher();
    let mut form = UploadForm::default();

    let read = read_upload_form(publisher, channel, &mut multipart, &mut form, true).await;
    let upload = settle(publisher, read, form.upload).await?;

    let cover = publisher.finish_cover_upload(upload).await?;
    Ok(Json(CoverReply { cover }))
}

/// DELETE /api/channel/:channel/cover/:cover
pub async fn delete_cover(
    State(state): State<AppState>,
    ChannelId(channel): ChannelId,
    Path((_, cover)): Path<(String, String)>,
) -> ApiResult<NoContent> {
    state.publisher().delete_cover(channel, &cover).await?;
    Ok(NoContent)
}

/// GET /api/channel/:channel/podcast/:podcast
pub async fn podcast_info(
    State(state): State<AppState>,
    ChannelId(channel): ChannelId,
    PodcastId(podcast): PodcastId,
) -> ApiResult<Json<Podcast>> {
    Ok(Json(state.publisher().podcast_info(channel, podcast)?))
}

/// PUT /api/channel/:channel/podcast/:podcast
pub async fn update_podcast(
    State(state): State<AppState>,
    ChannelId(channel): ChannelId,
    PodcastId(podcast): PodcastId,
    Json(update): Json<PodcastUpdate>,
) -> ApiResult<Json<Podcast>> {
    Ok(Json(state.publisher().update_podcast(channel, podcast, update)?))
}

/// DELETE /api/channel/:channel/podcast/:podcast
pub async fn delete_podcast(
    State(state): State<AppState>,
    ChannelId(channel): ChannelId,
    PodcastId(podcast): PodcastId,
) -> ApiResult<NoContent> {
    state.publisher().delete_podcast(channel, podcast).await?;
    Ok(NoContent)
}

#[derive(Default)]
struct UploadForm {
    upload: Option<PendingUpload>,
    length: String,
}

/// Stream the `file` field into the content tree and collect `length`.
/// Fields may arrive in any order.
async fn read_upload_form(
    publisher: &Publisher,
    channel: i64,
    multipart: &mut Multipart,
    form: &mut UploadForm,
    cover: bool,
) -> ApiResult<()> {
    while let Some(mut field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" if form.upload.is_none() => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let upload = if cover {
                    publisher.start_cover_upload(channel, &filename).await?
                } else {
                    publisher.start_upload(channel, &filename).await?
                };
                let upload = form.upload.insert(upload);
                copy_field(&mut field, upload).await?;
            }
            "length" => form.length = field.text().await?,
            _ => {}
        }
    }
    Ok(())
}

async fn copy_field(field: &mut Field<'_>, upload: &mut PendingUpload) -> ApiResult<()> {
    while let Some(chunk) = field.chunk().await? {
        upload.write(&chunk).await?;
    }
    Ok(())
}

/// Turn the form outcome into an upload ready to finish, removing any
/// partially written file when reading failed
async fn settle(
    publisher: &Publisher,
    read: ApiResult<()>,
    upload: Option<PendingUpload>,
) -> ApiResult<PendingUpload> {
    match (read, upload) {
        (Ok(()), Some(upload)) => Ok(upload),
        (Ok(()), None) => Err(ApiError::MissingField("file")),
        (Err(e), Some(upload)) => {
            publisher.discard_upload(upload).await;
            Err(e)
        }
        (Err(e), None) => Err(e),
    }
}
