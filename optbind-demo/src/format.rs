use std::fmt;
use std::str::FromStr;

/// A serial frame format, such as `8N1`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Format {
    pub data_bits: u8,
    pub parity: Parity,
    pub stop_bits: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    None,
    Even,
    Odd,
}

impl Default for Format {
    fn default() -> Self {
        Self {
            data_bits: 8,
            parity: Parity::None,
            stop_bits: 1,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("expected a format like '8N1', got {0:?}")]
    Malformed(String),

    #[error("data bits must be between 5 and 8, got {0}")]
    DataBits(char),

    #[error("parity must be one of 'N', 'E' or 'O', got {0:?}")]
    Parity(char),

    #[error("stop bits must be 1 or 2, got {0}")]
    StopBits(char),
}

impl FromStr for Format {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let &[data_bits, parity, stop_bits] = s.chars().collect::<Vec<_>>().as_slice() else {
            return Err(FormatError::Malformed(s.to_owned()));
        };

        Ok(Self {
            data_bits: match data_bits {
                '5'..='8' => data_bits as u8 - b'0',
                c => return Err(FormatError::DataBits(c)),
            },
            parity: match parity.to_ascii_uppercase() {
                'N' => Parity::None,
                'E' => Parity::Even,
                'O' => Parity::Odd,
                _ => return Err(FormatError::Parity(parity)),
            },
            stop_bits: match stop_bits {
                '1' | '2' => stop_bits as u8 - b'0',
                c => return Err(FormatError::StopBits(c)),
            },
        })
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parity = match self.parity {
            Parity::None => 'N',
            Parity::Even => 'E',
            Parity::Odd => 'O',
        };

        write!(f, "{}{parity}{}", self.data_bits, self.stop_bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse() {
        let format: Format = "7e2".parse().unwrap();
        assert_eq!(
            format,
            Format {
                data_bits: 7,
                parity: Parity::Even,
                stop_bits: 2
            }
        );
        assert_eq!(format.to_string(), "7E2");

        assert_eq!("9N1".parse::<Format>(), Err(FormatError::DataBits('9')));
        assert_eq!("8X1".parse::<Format>(), Err(FormatError::Parity('X')));
        assert_eq!(
            "8N".parse::<Format>(),
            Err(FormatError::Malformed("8N".to_owned()))
        );
    }
}
