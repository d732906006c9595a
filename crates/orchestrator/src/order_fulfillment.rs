//! Order fulfillment workflow constants.

/// Step name: validate the incoming payload.
pub const STEP_VALIDATE_INPUT: &str = "validate-input";

/// Step name: compute the order subtotal.
pub const STEP_CALCULATE_SUBTOTAL: &str = "calculate-subtotal";

/// Parallel group containing the four worker branches.
pub const PARALLEL_WORKERS: &str = "workers";

/// Step name: validate the combined worker results.
pub const STEP_VALIDATE_RESULTS: &str = "validate-results";

/// Step name: compute subtotal + shipping + tax.
pub const STEP_CALCULATE_FINAL_TOTALS: &str = "calculate-final-totals";

/// Durable pause before finalization.
pub const WAIT_BEFORE_FINALIZE: &str = "finalize-delay";

/// Step name: assemble the order confirmation.
pub const STEP_FINALIZE_ORDER: &str = "finalize-order";

pub const MESSAGE_CONFIRMED: &str = "Order processed successfully with parallel execution";
pub const MESSAGE_REJECTED: &str = "Order validation failed";
pub const MESSAGE_FAILED: &str = "Order processing failed";
