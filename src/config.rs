use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageStorageKind {
    Local,
    Cloudinary,
}

#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub folder: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub image_storage: ImageStorageKind,
    pub upload_dir: String,
    pub cloudinary: Option<CloudinaryConfig>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET is not set"))?;

        let image_storage = match env::var("IMAGE_STORAGE")
            .unwrap_or_else(|_| "local".to_string())
            .to_lowercase()
            .as_str()
        {
            "local" => ImageStorageKind::Local,
            "cloudinary" => ImageStorageKind::Cloudinary,
            other => anyhow::bail!("unknown IMAGE_STORAGE '{other}', expected local or cloudinary"),
        };
        let upload_dir = env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string());

        let cloudinary = match image_storage {
            ImageStorageKind::Cloudinary => Some(CloudinaryConfig {
                cloud_name: env::var("CLOUDINARY_CLOUD_NAME")?,
                api_key: env::var("CLOUDINARY_API_KEY")?,
                api_secret: env::var("CLOUDINARY_API_SECRET")?,
                folder: env::var("CLOUDINARY_FOLDER").unwrap_or_else(|_| "products".to_string()),
            }),
            ImageStorageKind::Local => None,
        };

        Ok(Self {
            port,
            database_url,
            host,
            jwt_secret,
            image_storage,
            upload_dir,
            cloudinary,
        })
    }
}
