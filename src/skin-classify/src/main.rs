use std::env;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use structopt::StructOpt;

use skin_serve::{
    ClientConfig, SkinClassifier, TokenSource, UploadedImage, DEFAULT_MODEL_ENDPOINT,
};

#[derive(StructOpt, Debug)]
#[structopt(
    name = "skin-classify",
    about = "CLI app to classify the skin type on a photo"
)]
struct CmdArgs {
    #[structopt(help = "Path to the image file")]
    image: PathBuf,

    #[structopt(
        long,
        help = "Prediction endpoint URL (defaults to $MODEL_ENDPOINT, then the built-in endpoint)"
    )]
    endpoint: Option<String>,

    #[structopt(long, help = "Bearer token (defaults to $GOOGLE_ACCESS_TOKEN)")]
    token: Option<String>,
}

fn mime_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|extension| extension.to_str())
        .map(str::to_lowercase);

    match extension.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        _ => "application/octet-stream",
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = CmdArgs::from_args();

    let endpoint = args
        .endpoint
        .or_else(|| env::var("MODEL_ENDPOINT").ok())
        .unwrap_or_else(|| DEFAULT_MODEL_ENDPOINT.to_owned());
    let token = match args.token {
        Some(token) => TokenSource::Fixed(token),
        None => TokenSource::from_default_env(),
    };

    let filename = args
        .image
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_owned);
    let bytes = fs::read(&args.image)?;
    info!("read {} bytes from {}", bytes.len(), args.image.display());

    let upload = UploadedImage::new(bytes, mime_for(&args.image), filename)?;

    let classifier = SkinClassifier::new(ClientConfig::new(endpoint), token)?;
    let classification = classifier.classify(&upload).await?;

    println!("{}", serde_json::to_string(&classification)?);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_follows_the_file_extension() {
        assert_eq!(mime_for(Path::new("face.JPG")), "image/jpeg");
        assert_eq!(mime_for(Path::new("face.jpeg")), "image/jpeg");
        assert_eq!(mime_for(Path::new("skin.png")), "image/png");
        assert_eq!(mime_for(Path::new("anim.webp")), "image/webp");
    }

    #[test]
    fn unknown_extensions_are_not_images() {
        assert_eq!(mime_for(Path::new("notes.txt")), "application/octet-stream");
        assert_eq!(mime_for(Path::new("no_extension")), "application/octet-stream");
    }
}
