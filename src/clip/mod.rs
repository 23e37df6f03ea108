pub(crate) mod ease;
pub(crate) mod model;
pub(crate) mod scaled;
