//! Crate-level tests for the upload pipeline

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use kernel::id::UserId;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use platform::clock::ManualClock;
use platform::rate_limit::FixedWindowRateLimiter;

use crate::application::config::{DEFAULT_MAX_UPLOAD_BYTES, MediaConfig};
use crate::application::upload_image::{UploadImageInput, UploadImageUseCase};
use crate::domain::codec::ImageCodec;
use crate::domain::entities::EncodedImage;
use crate::domain::value_objects::{ImageFormat, UploadKind};
use crate::error::{MediaError, MediaResult};
use crate::infra::codec::{PassThroughCodec, RasterCodec};
use crate::infra::memory::InMemoryProfileRepository;

type Limiter = FixedWindowRateLimiter<ManualClock>;

/// Codec that records calls and returns a fixed payload
struct SpyCodec {
    calls: AtomicUsize,
    output: Vec<u8>,
}

impl SpyCodec {
    fn returning(len: usize) -> Arc<Self> {
        let mut output = vec![0u8; len];
        output[..3].copy_from_slice(&[0xFF, 0xD8, 0xFF]);
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            output,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ImageCodec for SpyCodec {
    fn name(&self) -> &'static str {
        "spy"
    }

    fn normalize(
        &self,
        _input: &[u8],
        _format: ImageFormat,
        _kind: UploadKind,
    ) -> MediaResult<EncodedImage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(EncodedImage {
            bytes: self.output.clone(),
            format: ImageFormat::Jpeg,
            dimensions: None,
            quality: Some(75),
            attempts: 0,
        })
    }
}

struct Fixture {
    use_case: UploadImageUseCase<InMemoryProfileRepository, Limiter>,
    repo: Arc<InMemoryProfileRepository>,
    clock: ManualClock,
    user: UserId,
}

fn fixture(codec: Arc<dyn ImageCodec>) -> Fixture {
    let repo = Arc::new(InMemoryProfileRepository::new());
    let user = UserId::new();
    repo.insert_user(user);
    let clock = ManualClock::new(1_700_000_000_000);
    let limiter = Arc::new(FixedWindowRateLimiter::with_clock(clock.clone()));
    let use_case = UploadImageUseCase::new(
        repo.clone(),
        limiter,
        codec,
        Arc::new(MediaConfig::default()),
    );
    Fixture {
        use_case,
        repo,
        clock,
        user,
    }
}

fn encode(img: RgbImage, format: image::ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img).write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x / 12 % 256) as u8, (y / 12 % 256) as u8, 128])
    })
}

fn decode_data_url(url: &str) -> (String, Vec<u8>) {
    let rest = url.strip_prefix("data:").unwrap();
    let (mime, payload) = rest.split_once(";base64,").unwrap();
    (
        mime.to_string(),
        platform::encoding::from_base64(payload).unwrap(),
    )
}

fn input(user: UserId, kind: UploadKind, content_type: &str, bytes: Vec<u8>) -> UploadImageInput {
    UploadImageInput {
        user_id: user,
        kind,
        content_type: content_type.to_string(),
        bytes,
    }
}

fn seeded_bytes(seed: u64, len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    StdRng::seed_from_u64(seed).fill_bytes(&mut bytes);
    bytes
}

/// Per-pixel noise, which JPEG cannot compress well
fn noise(width: u32, height: u32, seed: u64) -> RgbImage {
    let pixels = seeded_bytes(seed, (width * height * 3) as usize);
    RgbImage::from_raw(width, height, pixels).unwrap()
}

#[cfg(test)]
mod validation_tests {
    use super::*;

    #[tokio::test]
    async fn test_text_declared_as_png_is_rejected_before_codec() {
        let spy = SpyCodec::returning(100);
        let f = fixture(spy.clone());

        let err = f
            .use_case
            .execute(input(
                f.user,
                UploadKind::Avatar,
                "image/png",
                b"not an img".to_vec(),
            ))
            .await
            .unwrap_err();

        assert!(matches!(err, MediaError::InvalidImageContent), "{err:?}");
        assert_eq!(spy.calls(), 0, "codec must not run on invalid content");
        assert_eq!(f.repo.profile(&f.user).unwrap().image, None);
    }

    #[tokio::test]
    async fn test_unsigned_bytes_rejected_for_every_declared_type() {
        let spy = SpyCodec::returning(100);
        let f = fixture(spy.clone());

        for seed in 1..=200u64 {
            let bytes = seeded_bytes(seed, 16 + seed as usize);
            if ImageFormat::sniff(&bytes).is_some() {
                continue;
            }
            for declared in ["image/jpeg", "image/jpg", "image/png", "image/webp"] {
                let err = f
                    .use_case
                    .execute(input(f.user, UploadKind::Banner, declared, bytes.clone()))
                    .await
                    .unwrap_err();
                assert!(
                    matches!(err, MediaError::InvalidImageContent),
                    "seed {seed} declared {declared}: {err:?}"
                );
            }
        }
        assert_eq!(spy.calls(), 0);
    }

    #[tokio::test]
    async fn test_declared_type_outside_allow_list() {
        let spy = SpyCodec::returning(100);
        let f = fixture(spy.clone());
        let png = encode(gradient(10, 10), image::ImageFormat::Png);

        let err = f
            .use_case
            .execute(input(f.user, UploadKind::Avatar, "image/gif", png))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::UnsupportedMediaType(t) if t == "image/gif"));
        assert_eq!(spy.calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_payload_is_missing_file() {
        let f = fixture(SpyCodec::returning(100));
        let err = f
            .use_case
            .execute(input(f.user, UploadKind::Avatar, "image/png", Vec::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::MissingFile));
    }

    #[tokio::test]
    async fn test_raw_payload_over_limit_is_rejected_before_codec() {
        let spy = SpyCodec::returning(100);
        let f = fixture(spy.clone());
        let mut bytes = vec![0u8; DEFAULT_MAX_UPLOAD_BYTES + 1];
        bytes[..3].copy_from_slice(&[0xFF, 0xD8, 0xFF]);

        let err = f
            .use_case
            .execute(input(f.user, UploadKind::Banner, "image/jpeg", bytes))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::ImageTooLarge { .. }), "{err:?}");
        assert_eq!(spy.calls(), 0);
    }

    #[tokio::test]
    async fn test_multi_megabyte_photo_reaches_codec() {
        let spy = SpyCodec::returning(100);
        let f = fixture(spy.clone());
        let mut bytes = seeded_bytes(7, 8 * 1024 * 1024);
        bytes[..3].copy_from_slice(&[0xFF, 0xD8, 0xFF]);

        let output = f
            .use_case
            .execute(input(f.user, UploadKind::Avatar, "image/jpeg", bytes))
            .await
            .unwrap();
        assert_eq!(spy.calls(), 1);
        assert_eq!(
            f.repo.profile(&f.user).unwrap().image.as_deref(),
            Some(output.data_url.as_str())
        );
    }
}

#[cfg(test)]
mod pipeline_tests {
    use super::*;

    #[tokio::test]
    async fn test_large_jpeg_avatar_fits_bounds_and_ceiling() {
        let f = fixture(Arc::new(RasterCodec::default()));
        let jpeg = encode(gradient(3000, 3000), image::ImageFormat::Jpeg);

        let output = f
            .use_case
            .execute(input(f.user, UploadKind::Avatar, "image/jpeg", jpeg))
            .await
            .unwrap();

        assert!(output.data_url.len() <= 60_000);
        let (mime, bytes) = decode_data_url(&output.data_url);
        assert_eq!(mime, "image/jpeg");
        let (w, h) = image::load_from_memory(&bytes).unwrap().dimensions();
        assert!(w <= 200 && h <= 200, "got {w}x{h}");
        assert_eq!((w, h), (200, 200));

        let stored = f.repo.profile(&f.user).unwrap();
        assert_eq!(stored.image.as_deref(), Some(output.data_url.as_str()));
        assert_eq!(stored.banner, None);
        assert_eq!(output.message, "Avatar updated successfully");
    }

    #[test]
    fn test_noisy_banner_is_recompressed_at_most_three_times() {
        let png = encode(noise(1200, 400, 11), image::ImageFormat::Png);
        let initial = UploadKind::Banner.initial_quality(png.len());

        let out = RasterCodec::default()
            .normalize(&png, ImageFormat::Png, UploadKind::Banner)
            .unwrap();
        let quality = out.quality.unwrap();

        assert!(out.attempts >= 1, "noise must not fit on the first encode");
        assert!(out.attempts <= 3);
        assert!(quality < initial);
        assert!(quality >= 30);
        assert!(u32::from(initial - quality) <= out.attempts * 10);
    }

    #[tokio::test]
    async fn test_noisy_upload_fits_ceiling_or_fails_explicitly() {
        for (kind, (w, h)) in [
            (UploadKind::Avatar, (200, 200)),
            (UploadKind::Banner, (1200, 400)),
        ] {
            let f = fixture(Arc::new(RasterCodec::default()));
            let png = encode(noise(w, h, 23), image::ImageFormat::Png);

            match f
                .use_case
                .execute(input(f.user, kind, "image/png", png))
                .await
            {
                Ok(output) => {
                    assert!(output.data_url.len() <= 60_000);
                    assert!(f.repo.profile(&f.user).is_some());
                }
                Err(MediaError::ImageTooLarge { actual, limit }) => {
                    assert_eq!(limit, 60_000);
                    assert!(actual > limit);
                    let stored = f.repo.profile(&f.user).unwrap();
                    assert_eq!(stored.image, None);
                    assert_eq!(stored.banner, None);
                }
                Err(other) => panic!("{kind}: unexpected {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_banner_keeps_aspect_ratio() {
        let f = fixture(Arc::new(RasterCodec::default()));
        let png = encode(gradient(2400, 600), image::ImageFormat::Png);

        let output = f
            .use_case
            .execute(input(f.user, UploadKind::Banner, "image/png", png))
            .await
            .unwrap();

        let (_, bytes) = decode_data_url(&output.data_url);
        assert_eq!(image::load_from_memory(&bytes).unwrap().dimensions(), (1200, 300));
        assert_eq!(
            f.repo.profile(&f.user).unwrap().banner.as_deref(),
            Some(output.data_url.as_str())
        );
    }

    #[tokio::test]
    async fn test_output_over_data_url_ceiling_fails_without_writing() {
        // 50 000 raw bytes encode to ~66 700 base64 characters
        let spy = SpyCodec::returning(50_000);
        let f = fixture(spy.clone());
        let png = encode(gradient(10, 10), image::ImageFormat::Png);

        let err = f
            .use_case
            .execute(input(f.user, UploadKind::Avatar, "image/png", png))
            .await
            .unwrap_err();
        assert!(
            matches!(err, MediaError::ImageTooLarge { limit: 60_000, .. }),
            "{err:?}"
        );
        assert_eq!(spy.calls(), 1);
        assert_eq!(f.repo.profile(&f.user).unwrap().image, None);
    }

    #[tokio::test]
    async fn test_passthrough_stores_original_format() {
        let f = fixture(Arc::new(PassThroughCodec::new(1_000_000)));
        let png = encode(gradient(16, 16), image::ImageFormat::Png);

        let output = f
            .use_case
            .execute(input(f.user, UploadKind::Avatar, "image/png", png.clone()))
            .await
            .unwrap();
        let (mime, bytes) = decode_data_url(&output.data_url);
        assert_eq!(mime, "image/png");
        assert_eq!(bytes, png);
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let f = fixture(SpyCodec::returning(100));
        let png = encode(gradient(10, 10), image::ImageFormat::Png);

        let err = f
            .use_case
            .execute(input(UserId::new(), UploadKind::Avatar, "image/png", png))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::UserNotFound));
    }
}

#[cfg(test)]
mod admission_tests {
    use super::*;

    #[tokio::test]
    async fn test_sixth_upload_in_window_is_denied() {
        let f = fixture(SpyCodec::returning(100));
        for _ in 0..5 {
            f.use_case.admit(&f.user).await.unwrap();
        }

        f.clock.advance_ms(15_000);
        let err = f.use_case.admit(&f.user).await.unwrap_err();
        assert!(
            matches!(err, MediaError::RateLimitExceeded { retry_after_secs: 45 }),
            "{err:?}"
        );

        // Other users have their own window
        f.use_case.admit(&UserId::new()).await.unwrap();

        f.clock.advance_ms(45_000);
        f.use_case.admit(&f.user).await.unwrap();
    }

    #[test]
    fn test_rate_limit_key_format() {
        let user: UserId = "6f1c1f8e-7a5b-4a7e-9a43-0c0e6b0f2a11".parse().unwrap();
        assert_eq!(
            UploadImageUseCase::<InMemoryProfileRepository, Limiter>::rate_limit_key(&user),
            "upload-image_6f1c1f8e-7a5b-4a7e-9a43-0c0e6b0f2a11"
        );
    }
}

#[cfg(test)]
mod router_tests {
    use super::*;
    use crate::presentation::handlers::{MediaAppState, USER_ID_HEADER};
    use crate::presentation::router::media_router;
    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;

    const BOUNDARY: &str = "animeka-test-boundary";

    struct App {
        router: Router,
        repo: Arc<InMemoryProfileRepository>,
        user: UserId,
    }

    fn app() -> App {
        let repo = Arc::new(InMemoryProfileRepository::new());
        let user = UserId::new();
        repo.insert_user(user);
        let state = MediaAppState {
            repo: repo.clone(),
            limiter: Arc::new(FixedWindowRateLimiter::with_clock(ManualClock::new(0))),
            codec: Arc::new(RasterCodec::default()) as Arc<dyn ImageCodec>,
            config: Arc::new(MediaConfig::default()),
        };
        App {
            router: media_router(state),
            repo,
            user,
        }
    }

    fn multipart_body(kind: &str, content_type: &str, file: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"type\"\r\n\r\n{kind}\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"upload\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(file);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload_request(user: Option<UserId>, body: Vec<u8>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/upload-image")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            );
        if let Some(user) = user {
            builder = builder.header(USER_ID_HEADER, user.to_string());
        }
        builder.body(Body::from(body)).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_upload_success() {
        let app = app();
        let png = encode(gradient(400, 400), image::ImageFormat::Png);

        let response = app
            .router
            .oneshot(upload_request(
                Some(app.user),
                multipart_body("avatar", "image/png", &png),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Avatar updated successfully");
        let url = body["url"].as_str().unwrap();
        assert!(url.starts_with("data:image/jpeg;base64,"));
        assert_eq!(
            app.repo.profile(&app.user).unwrap().image.as_deref(),
            Some(url)
        );
    }

    #[tokio::test]
    async fn test_missing_user_header_is_unauthorized() {
        let app = app();
        let response = app
            .router
            .oneshot(upload_request(
                None,
                multipart_body("avatar", "image/png", b"irrelevant"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["success"], false);
    }

    #[tokio::test]
    async fn test_invalid_content_and_type_errors() {
        let app = app();

        let response = app
            .router
            .clone()
            .oneshot(upload_request(
                Some(app.user),
                multipart_body("avatar", "image/png", b"not an img"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"], "The file is not a valid image");

        let response = app
            .router
            .clone()
            .oneshot(upload_request(
                Some(app.user),
                multipart_body("avatar", "image/gif", b"GIF89a"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let response = app
            .router
            .oneshot(upload_request(
                Some(app.user),
                multipart_body("cover", "image/png", b"\x89PNG"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_rate_limited_with_retry_after() {
        let app = app();
        for _ in 0..5 {
            let response = app
                .router
                .clone()
                .oneshot(upload_request(
                    Some(app.user),
                    multipart_body("avatar", "image/png", b"not an img"),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }

        let response = app
            .router
            .oneshot(upload_request(
                Some(app.user),
                multipart_body("avatar", "image/png", b"not an img"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "60");
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["retryAfter"], 60);
    }
}
