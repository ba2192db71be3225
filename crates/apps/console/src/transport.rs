use formats::FeatureCollection;
use protocol::{
    BackendError, CommandReply, CommandRequest, UploadRequest, decode_command_reply,
    decode_upload_reply,
};
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use tracing::debug;

/// Resolved backend locations.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub upload_url: String,
    pub command_url: String,
    /// When set, commands go to the older single-command endpoint instead.
    pub legacy_command_url: Option<String>,
}

fn transport_err(err: reqwest::Error) -> BackendError {
    BackendError::Transport(err.to_string())
}

pub async fn send_upload(
    client: &Client,
    url: &str,
    request: &UploadRequest,
) -> Result<FeatureCollection, BackendError> {
    let mut form = Form::new();
    for (field, file) in request.parts() {
        let Some(path) = file.location.as_ref() else {
            return Err(BackendError::Transport(format!(
                "{} has no readable location",
                file.name
            )));
        };
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| BackendError::Transport(format!("{}: {e}", path.display())))?;
        form = form.part(field, Part::bytes(bytes).file_name(file.name.clone()));
    }

    debug!("POST {url} ({} part(s))", request.files.len());
    let resp = client
        .post(url)
        .multipart(form)
        .send()
        .await
        .map_err(transport_err)?;
    let status = resp.status().as_u16();
    let body = resp.text().await.map_err(transport_err)?;
    decode_upload_reply(status, &body)
}

pub async fn send_command(
    client: &Client,
    endpoints: &Endpoints,
    request: &CommandRequest,
) -> Result<CommandReply, BackendError> {
    let builder = match &endpoints.legacy_command_url {
        Some(url) => {
            debug!("POST {url} (legacy)");
            client.post(url).json(&request.legacy())
        }
        None => {
            debug!("POST {}", endpoints.command_url);
            client.post(&endpoints.command_url).json(request)
        }
    };
    let resp = builder.send().await.map_err(transport_err)?;
    let status = resp.status().as_u16();
    let body = resp.text().await.map_err(transport_err)?;
    decode_command_reply(status, &body)
}
