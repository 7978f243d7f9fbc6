use atb_lib::DiscountService;

/// Shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub service: DiscountService,
}
