macro_rules! generate_getters {
  {
    $(<$($L:lifetime)*>)? for $T:ty as $self:ident {
      $(
        $(#[$meta:meta])*
        $field:ident -> $R:ty $(= $e:expr)?
      ),* $(,)?
    }
  } => {
    impl$(<$($L)*>)? $T {
      $(
        #[inline]
        $(#[$meta])*
        pub fn $field(&$self) -> $R {
          generate_getters!(@getter $self $field $($e)?)
        }
      )*
    }
  };

  (@getter $self:ident $field:ident $e:expr) => ($e);
  (@getter $self:ident $field:ident) => ($self.$field.clone());
}

#[cfg(test)]
pub(crate) fn parse_irc<T: crate::msg::FromIrc>(
  input: &str,
) -> Result<T, crate::msg::MessageParseError> {
  let raw = crate::irc::IrcMessageRef::parse(input).ok_or(crate::msg::MessageParseError)?;
  <T as crate::msg::FromIrc>::from_irc(&raw)
}
