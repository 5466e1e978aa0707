//! Marker types.

/// Marker type describing an entity creation.
#[derive(Clone, Copy, Debug)]
pub struct Creation;

/// Marker type describing a reservation confirmation.
#[derive(Clone, Copy, Debug)]
pub struct Confirmation;

/// Marker type describing a reservation cancellation.
#[derive(Clone, Copy, Debug)]
pub struct Cancellation;

/// Marker type describing a payment receipt.
#[derive(Clone, Copy, Debug)]
pub struct Payment;
