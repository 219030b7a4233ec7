use futures::future::{AbortHandle, Abortable};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

use super::{Notice, Notifier, Screen, ScreenView};
use crate::ai::workflow::{AnalysisWorkflow, Verdict};
use crate::ai::{AnalysisResult, VisionClient};
use crate::capture::camera::{self, CameraOptions, CameraPermission};
use crate::capture::library::{self, LibraryOptions};
use crate::capture::{CaptureStore, CapturedImage};
use crate::error::{CaptureError, ScreenError};

/// Owns the screen state and drives capture → analysis → display.
pub struct RecipeScreen<C> {
    state: Mutex<Screen>,
    workflow: Mutex<Arc<AnalysisWorkflow<C>>>,
    store: CaptureStore,
    notifier: Arc<dyn Notifier>,
}

impl<C: VisionClient> RecipeScreen<C> {
    pub fn new(workflow: AnalysisWorkflow<C>, store: CaptureStore, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            state: Mutex::new(Screen::Idle),
            workflow: Mutex::new(Arc::new(workflow)),
            store,
            notifier,
        }
    }

    pub fn view(&self) -> ScreenView {
        self.state.lock().view()
    }

    /// The current photo as a `data:` URI the webview can render.
    pub fn image_data_uri(&self) -> Option<String> {
        self.state
            .lock()
            .image()
            .map(|image| format!("data:image/jpeg;base64,{}", image.base64))
    }

    pub fn store(&self) -> &CaptureStore {
        &self.store
    }

    /// Swap the workflow used by later analyses; one in flight keeps its own.
    pub fn reconfigure(&self, workflow: AnalysisWorkflow<C>) {
        *self.workflow.lock() = Arc::new(workflow);
    }

    fn set(&self, state: &mut Screen, next: Screen) {
        *state = next;
        self.notifier.screen_changed(&state.view());
    }

    pub fn open_camera(&self, permission: CameraPermission) -> Result<(), ScreenError> {
        let mut state = self.state.lock();
        if !matches!(*state, Screen::Idle) {
            return Err(ScreenError::InvalidTransition {
                state: state.name(),
                action: "open the camera",
            });
        }

        if let Err(e) = permission.require() {
            log::warn!("Camera unavailable: {}", e);
            self.notifier.notice(&Notice::CameraPermissionDenied);
            return Ok(());
        }

        self.set(&mut state, Screen::Camera);
        Ok(())
    }

    pub fn close_camera(&self) -> Result<(), ScreenError> {
        let mut state = self.state.lock();
        if !matches!(*state, Screen::Camera) {
            return Err(ScreenError::InvalidTransition {
                state: state.name(),
                action: "close the camera",
            });
        }
        self.set(&mut state, Screen::Idle);
        Ok(())
    }

    /// Shutter pressed: store the frame and analyze it.
    pub async fn take_picture(&self, frame: &str, options: &CameraOptions) -> Result<(), ScreenError> {
        {
            let state = self.state.lock();
            if !matches!(*state, Screen::Camera) {
                return Err(ScreenError::InvalidTransition {
                    state: state.name(),
                    action: "take a picture",
                });
            }
        }

        match camera::capture_frame(frame, options, &self.store) {
            Ok(image) => self.analyze_image(image).await,
            Err(e) => {
                self.capture_failed(Notice::CaptureFailed(e.to_string()), &e);
                Ok(())
            }
        }
    }

    /// A picker finished. `None` means the user backed out.
    pub async fn select_image(
        &self,
        picked: Option<&Path>,
        options: &LibraryOptions,
    ) -> Result<(), ScreenError> {
        {
            let state = self.state.lock();
            if !matches!(*state, Screen::Idle) {
                return Err(ScreenError::InvalidTransition {
                    state: state.name(),
                    action: "select an image",
                });
            }
        }

        let Some(path) = picked else {
            log::debug!("Image selection cancelled");
            return Ok(());
        };

        match library::load_image(path, options, &self.store) {
            Ok(image) => self.analyze_image(image).await,
            Err(e) => {
                self.capture_failed(Notice::LibraryFailed(e.to_string()), &e);
                Ok(())
            }
        }
    }

    fn capture_failed(&self, notice: Notice, error: &CaptureError) {
        log::error!("{}: {}", notice.message(), error);
        self.notifier.notice(&notice);
        let mut state = self.state.lock();
        if matches!(*state, Screen::Camera) {
            self.set(&mut state, Screen::Idle);
        }
    }

    /// Run one analysis for `image` and publish its outcome.
    pub async fn analyze_image(&self, image: CapturedImage) -> Result<(), ScreenError> {
        if image.base64.is_empty() {
            log::error!("No image data provided");
            return Ok(());
        }

        let (abort, registration) = AbortHandle::new_pair();
        let workflow = {
            let mut state = self.state.lock();
            match *state {
                Screen::Idle | Screen::Camera => {}
                Screen::Loading { .. } => return Err(ScreenError::Busy),
                _ => {
                    return Err(ScreenError::InvalidTransition {
                        state: state.name(),
                        action: "start an analysis",
                    })
                }
            }
            self.set(
                &mut state,
                Screen::Loading {
                    image: image.clone(),
                    abort,
                },
            );
            self.workflow.lock().clone()
        };

        let outcome = Abortable::new(workflow.analyze(&image.base64), registration).await;

        let mut state = self.state.lock();
        let still_ours = matches!(&*state, Screen::Loading { image: current, .. } if current.id == image.id);
        if !still_ours {
            log::debug!("Dropping result for abandoned capture {}", image.id);
            return Ok(());
        }

        match outcome {
            Ok(Ok(Verdict::Food(result))) => {
                self.set(&mut state, Screen::Displaying { image, result });
            }
            Ok(Ok(Verdict::NoFood)) => {
                log::info!("No food detected in capture {}", image.id);
                self.store.discard(&image);
                self.set(&mut state, Screen::Idle);
                drop(state);
                self.notifier.notice(&Notice::NoFoodDetected);
            }
            Ok(Err(e)) => {
                log::error!("Error analyzing image: {}", e);
                let result = AnalysisResult::degraded(&e);
                self.set(&mut state, Screen::DisplayingDegraded { image, result });
            }
            Err(_aborted) => {
                // cancel_analysis already moved the screen on
                log::debug!("Analysis for capture {} aborted", image.id);
            }
        }
        Ok(())
    }

    /// Abort the in-flight analysis and drop its image.
    pub fn cancel_analysis(&self) -> Result<(), ScreenError> {
        let mut state = self.state.lock();
        let Screen::Loading { image, abort } = &*state else {
            return Err(ScreenError::InvalidTransition {
                state: state.name(),
                action: "cancel",
            });
        };

        log::info!("Cancelling analysis of capture {}", image.id);
        abort.abort();
        self.store.discard(image);
        self.set(&mut state, Screen::Idle);
        Ok(())
    }

    /// Clear the image and result and go back to the capture buttons.
    pub fn new_photo(&self) -> Result<(), ScreenError> {
        let mut state = self.state.lock();
        match &*state {
            Screen::Loading { .. } => return Err(ScreenError::Busy),
            Screen::Displaying { image, .. } | Screen::DisplayingDegraded { image, .. } => {
                self.store.discard(image);
            }
            Screen::Idle | Screen::Camera => {}
        }
        self.set(&mut state, Screen::Idle);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::workflow::AnalysisSettings;
    use crate::ai::MockVisionClient;
    use crate::capture::ImageOrigin;
    use crate::config::ResponseMode;
    use crate::error::AnalysisError;
    use base64::{engine::general_purpose::STANDARD, Engine};
    use image::{DynamicImage, ImageFormat, RgbImage};
    use std::io::Cursor;
    use std::time::Duration;
    use tempfile::TempDir;

    const PANCAKES: &str = r#"{"containsFood":true,"ingredients":["egg","flour"],"recipes":[{"name":"Pancakes","description":"Mix and fry."}]}"#;

    #[derive(Default)]
    struct RecordingNotifier {
        notices: Mutex<Vec<Notice>>,
        views: Mutex<Vec<ScreenView>>,
    }

    impl Notifier for RecordingNotifier {
        fn notice(&self, notice: &Notice) {
            self.notices.lock().push(notice.clone());
        }

        fn screen_changed(&self, view: &ScreenView) {
            self.views.lock().push(view.clone());
        }
    }

    struct Fixture {
        screen: Arc<RecipeScreen<MockVisionClient>>,
        notifier: Arc<RecordingNotifier>,
        _dir: TempDir,
    }

    fn fixture(client: MockVisionClient, mode: ResponseMode) -> Fixture {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = tempfile::tempdir().unwrap();
        let store = CaptureStore::new(dir.path().join("captures")).unwrap();
        let notifier = Arc::new(RecordingNotifier::default());
        let workflow = AnalysisWorkflow::new(
            client,
            AnalysisSettings {
                mode,
                ..AnalysisSettings::default()
            },
        );
        Fixture {
            screen: Arc::new(RecipeScreen::new(workflow, store, notifier.clone())),
            notifier,
            _dir: dir,
        }
    }

    fn replying(content: String) -> MockVisionClient {
        let mut client = MockVisionClient::new();
        client.expect_complete().times(1).returning(move |_| {
            let content = content.clone();
            Box::pin(async move { Ok(content) })
        });
        client
    }

    fn failing(error: fn() -> AnalysisError) -> MockVisionClient {
        let mut client = MockVisionClient::new();
        client
            .expect_complete()
            .times(1)
            .returning(move |_| Box::pin(async move { Err(error()) }));
        client
    }

    fn stored(fx: &Fixture) -> CapturedImage {
        fx.screen.store().store(b"\xff\xd8\xff", ImageOrigin::Camera).unwrap()
    }

    fn png_frame() -> String {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, image::Rgb([1, 2, 3])));
        let mut buffer = Cursor::new(Vec::new());
        image.write_to(&mut buffer, ImageFormat::Png).unwrap();
        format!("data:image/png;base64,{}", STANDARD.encode(buffer.into_inner()))
    }

    #[tokio::test]
    async fn food_result_is_published() {
        let fx = fixture(replying(PANCAKES.to_string()), ResponseMode::Structured);
        let image = stored(&fx);

        fx.screen.analyze_image(image.clone()).await.unwrap();

        match fx.screen.view() {
            ScreenView::Displaying { image_uri, result, .. } => {
                assert_eq!(image_uri, image.display_uri);
                assert_eq!(result.ingredients, vec!["egg", "flour"]);
                assert_eq!(result.recipes.len(), 1);
                assert_eq!(result.recipes[0].name, "Pancakes");
            }
            other => panic!("unexpected view {other:?}"),
        }

        assert_eq!(
            fx.screen.image_data_uri().unwrap(),
            format!("data:image/jpeg;base64,{}", image.base64)
        );

        let views = fx.notifier.views.lock();
        assert!(matches!(views[0], ScreenView::Loading { .. }));
        assert!(matches!(views[1], ScreenView::Displaying { .. }));
    }

    #[tokio::test]
    async fn no_food_clears_image_and_result() {
        let fx = fixture(
            replying(r#"{"containsFood":false,"ingredients":["a"],"recipes":[{"name":"b","description":"c"}]}"#.to_string()),
            ResponseMode::Structured,
        );
        let image = stored(&fx);

        fx.screen.analyze_image(image.clone()).await.unwrap();

        assert_eq!(fx.screen.view(), ScreenView::Idle);
        assert_eq!(*fx.notifier.notices.lock(), vec![Notice::NoFoodDetected]);
        assert!(!Path::new(&image.display_uri).exists());
    }

    #[tokio::test]
    async fn http_failure_degrades_to_single_sentinel() {
        let fx = fixture(
            failing(|| AnalysisError::Api("Rate limit reached (429 Too Many Requests)".into())),
            ResponseMode::Structured,
        );

        fx.screen.analyze_image(stored(&fx)).await.unwrap();

        match fx.screen.view() {
            ScreenView::DisplayingDegraded { result, .. } => {
                assert_eq!(result.ingredients, vec!["Error analyzing image"]);
                assert!(result.recipes.is_empty());
            }
            other => panic!("unexpected view {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_fence_degrades_like_http_failure() {
        let fx = fixture(
            replying("Looks like pancakes to me.".to_string()),
            ResponseMode::FencedBlock,
        );

        fx.screen.analyze_image(stored(&fx)).await.unwrap();

        match fx.screen.view() {
            ScreenView::DisplayingDegraded { result, .. } => {
                assert_eq!(result.ingredients.len(), 1);
                assert_eq!(result.ingredients[0], "Error processing response");
                assert!(result.recipes.is_empty());
            }
            other => panic!("unexpected view {other:?}"),
        }
    }

    #[tokio::test]
    async fn fenced_roundtrip_through_screen() {
        let fx = fixture(
            replying(format!("Here you go:\n```json\n{}\n```", PANCAKES)),
            ResponseMode::FencedBlock,
        );

        fx.screen.analyze_image(stored(&fx)).await.unwrap();

        let view = fx.screen.view();
        assert!(matches!(view, ScreenView::Displaying { ref result, .. } if result.ingredients == vec!["egg", "flour"]));
    }

    #[tokio::test]
    async fn empty_payload_changes_nothing() {
        let mut client = MockVisionClient::new();
        client.expect_complete().never();
        let fx = fixture(client, ResponseMode::Structured);
        let mut image = stored(&fx);
        image.base64.clear();

        fx.screen.analyze_image(image).await.unwrap();

        assert_eq!(fx.screen.view(), ScreenView::Idle);
        assert!(fx.notifier.views.lock().is_empty());
    }

    #[tokio::test]
    async fn second_analysis_while_loading_is_busy() {
        let mut client = MockVisionClient::new();
        client.expect_complete().times(1).returning(|_| {
            Box::pin(async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok(PANCAKES.to_string())
            })
        });
        let fx = fixture(client, ResponseMode::Structured);
        let first = stored(&fx);
        let second = stored(&fx);

        let screen = fx.screen.clone();
        let running = tokio::spawn(async move { screen.analyze_image(first).await });
        while !matches!(fx.screen.view(), ScreenView::Loading { .. }) {
            tokio::task::yield_now().await;
        }

        assert_eq!(fx.screen.analyze_image(second).await, Err(ScreenError::Busy));
        assert_eq!(fx.screen.new_photo(), Err(ScreenError::Busy));

        running.await.unwrap().unwrap();
        assert!(matches!(fx.screen.view(), ScreenView::Displaying { .. }));
    }

    #[tokio::test]
    async fn cancel_returns_to_idle_without_result() {
        let mut client = MockVisionClient::new();
        client.expect_complete().times(1).returning(|_| {
            Box::pin(async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(PANCAKES.to_string())
            })
        });
        let fx = fixture(client, ResponseMode::Structured);
        let image = stored(&fx);
        let uri = image.display_uri.clone();

        let screen = fx.screen.clone();
        let running = tokio::spawn(async move { screen.analyze_image(image).await });
        while !matches!(fx.screen.view(), ScreenView::Loading { .. }) {
            tokio::task::yield_now().await;
        }

        fx.screen.cancel_analysis().unwrap();
        running.await.unwrap().unwrap();

        assert_eq!(fx.screen.view(), ScreenView::Idle);
        assert!(!Path::new(&uri).exists());
        assert!(fx.screen.cancel_analysis().is_err());
    }

    #[tokio::test]
    async fn denied_permission_notifies_and_stays_idle() {
        let mut client = MockVisionClient::new();
        client.expect_complete().never();
        let fx = fixture(client, ResponseMode::Structured);

        fx.screen.open_camera(CameraPermission::Denied).unwrap();

        assert_eq!(fx.screen.view(), ScreenView::Idle);
        assert_eq!(*fx.notifier.notices.lock(), vec![Notice::CameraPermissionDenied]);
    }

    #[tokio::test]
    async fn camera_shutter_runs_analysis() {
        let fx = fixture(replying(PANCAKES.to_string()), ResponseMode::Structured);

        fx.screen.open_camera(CameraPermission::Granted).unwrap();
        assert_eq!(fx.screen.view(), ScreenView::Camera);
        assert!(fx.screen.open_camera(CameraPermission::Granted).is_err());

        fx.screen
            .take_picture(&png_frame(), &CameraOptions::default())
            .await
            .unwrap();

        match fx.screen.view() {
            ScreenView::Displaying { origin, .. } => assert_eq!(origin, ImageOrigin::Camera),
            other => panic!("unexpected view {other:?}"),
        }
    }

    #[tokio::test]
    async fn broken_frame_alerts_and_returns_to_idle() {
        let mut client = MockVisionClient::new();
        client.expect_complete().never();
        let fx = fixture(client, ResponseMode::Structured);

        fx.screen.open_camera(CameraPermission::Granted).unwrap();
        fx.screen
            .take_picture("data:image/png;base64,", &CameraOptions::default())
            .await
            .unwrap();

        assert_eq!(fx.screen.view(), ScreenView::Idle);
        assert!(matches!(
            fx.notifier.notices.lock().as_slice(),
            [Notice::CaptureFailed(_)]
        ));
    }

    #[tokio::test]
    async fn shutter_requires_open_camera() {
        let mut client = MockVisionClient::new();
        client.expect_complete().never();
        let fx = fixture(client, ResponseMode::Structured);

        let err = fx
            .screen
            .take_picture(&png_frame(), &CameraOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ScreenError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn cancelled_picker_is_silent() {
        let mut client = MockVisionClient::new();
        client.expect_complete().never();
        let fx = fixture(client, ResponseMode::Structured);

        fx.screen
            .select_image(None, &LibraryOptions::default())
            .await
            .unwrap();

        assert_eq!(fx.screen.view(), ScreenView::Idle);
        assert!(fx.notifier.notices.lock().is_empty());
        assert!(fx.notifier.views.lock().is_empty());
    }

    #[tokio::test]
    async fn unreadable_library_file_alerts() {
        let mut client = MockVisionClient::new();
        client.expect_complete().never();
        let fx = fixture(client, ResponseMode::Structured);
        let missing = fx._dir.path().join("missing.png");

        fx.screen
            .select_image(Some(&missing), &LibraryOptions::default())
            .await
            .unwrap();

        assert_eq!(fx.screen.view(), ScreenView::Idle);
        assert!(matches!(
            fx.notifier.notices.lock().as_slice(),
            [Notice::LibraryFailed(_)]
        ));
    }

    #[tokio::test]
    async fn library_pick_runs_analysis() {
        let fx = fixture(replying(PANCAKES.to_string()), ResponseMode::Structured);
        let source = fx._dir.path().join("lunch.png");
        DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 20, image::Rgb([9, 9, 9])))
            .save(&source)
            .unwrap();

        fx.screen
            .select_image(Some(&source), &LibraryOptions::default())
            .await
            .unwrap();

        match fx.screen.view() {
            ScreenView::Displaying { origin, .. } => assert_eq!(origin, ImageOrigin::Library),
            other => panic!("unexpected view {other:?}"),
        }
    }

    #[tokio::test]
    async fn new_photo_discards_image_and_result() {
        let fx = fixture(replying(PANCAKES.to_string()), ResponseMode::Structured);
        let image = stored(&fx);

        fx.screen.analyze_image(image.clone()).await.unwrap();
        fx.screen.new_photo().unwrap();

        assert_eq!(fx.screen.view(), ScreenView::Idle);
        assert!(!Path::new(&image.display_uri).exists());
    }

    #[tokio::test]
    async fn result_screen_blocks_direct_capture() {
        let fx = fixture(replying(PANCAKES.to_string()), ResponseMode::Structured);
        fx.screen.analyze_image(stored(&fx)).await.unwrap();

        let err = fx.screen.open_camera(CameraPermission::Granted).unwrap_err();
        assert!(matches!(err, ScreenError::InvalidTransition { .. }));
    }
}
