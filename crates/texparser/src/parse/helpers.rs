/// Reads the next token and matches it against the patterns.
///
/// If no pattern matches, or the input has ended, the enclosing function returns a [crate::parse::Error].
macro_rules! get_required_element {
    ($stream: expr, $expected: expr, $guidance: expr, $($pat:pat => $result:expr,)+) => {
        match ($stream).next()? {
            Some(token) => match token.value() {
                $(
                    $pat => $result,
                )+
                _ => {
                    let err = crate::parse::Error::new($stream.vm(), $expected, Some(token), $guidance);
                    return Err($stream.fatal_error(err));
                }
            },
            None => {
                let err = crate::parse::Error::new($stream.vm(), $expected, None, $guidance);
                return Err($stream.fatal_error(err));
            }
        }
    };
}

macro_rules! get_optional_element {
    ($stream: expr, $($pat:pat => $result:expr,)+) => {
        match ($stream).next()? {
            None => None,
            Some(token) => match token.value() {
                $(
                    $pat => Some($result),
                )+
                _ => {
                    $stream.back(token);
                    None
                }
            }
        }
    };
}

macro_rules! get_optional_element_with_token {
    ($stream: expr, $($pat:pat => $result:expr,)+) => {
        match ($stream).next()? {
            None => None,
            Some(token) => match token.value() {
                $(
                    $pat => Some(($result, token)),
                )+
                _ => {
                    $stream.back(token);
                    None
                },
            }
        }
    };
}
