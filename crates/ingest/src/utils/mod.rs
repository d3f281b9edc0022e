mod normalize;

pub(crate) use normalize::*;
