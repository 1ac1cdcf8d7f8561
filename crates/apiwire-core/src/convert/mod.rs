//! Value converters used by parameters, responses and unions

pub mod dates;
pub mod strict;
