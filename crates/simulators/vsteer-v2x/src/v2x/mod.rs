pub(crate) mod bucket;
pub(crate) mod device;
pub(crate) mod space;
pub(crate) mod switch;
