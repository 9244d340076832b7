use thiserror_no_std::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FanTachError {
    #[error("Tacho input pin {pin} is claimed by both channel {first} and channel {second}")]
    DuplicateInputPin { pin: u8, first: usize, second: usize },
    #[error("Tacho input pin {pin} (channel {channel}) is outside the addressable pin space")]
    InputPinOutOfRange { pin: u8, channel: usize },
    #[error("Filter requires arguments but none were given")]
    MissingFilterArgs(),
    #[error("Filter arguments could not be parsed")]
    MalformedFilterArgs(),
    #[error("Selected filter takes no arguments")]
    FilterTakesNoArgs(),
    #[error("Tacho output channel {0} does not exist")]
    OutputChannelOutOfRange(usize),
    #[error("Tacho input channel {0} does not exist")]
    SourceChannelOutOfRange(usize),
}
