/// Whether `address` is a mailbox of the form `local@domain.tld`.
///
/// The local part allows letters, digits and `._%+-`; the domain allows
/// letters, digits, `.` and `-`; the top-level domain is two to four letters.
#[must_use]
pub fn is_valid_address(address: &str) -> bool {
    let Some((local, host)) = address.split_once('@') else {
        return false;
    };
    let Some((domain, tld)) = host.rsplit_once('.') else {
        return false;
    };
    non_empty_all(local, |c| c.is_ascii_alphanumeric() || "._%+-".contains(c))
        && non_empty_all(domain, |c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
        && (2..=4).contains(&tld.len())
        && tld.chars().all(|c| c.is_ascii_alphabetic())
}

fn non_empty_all(text: &str, allowed: impl Fn(char) -> bool) -> bool {
    !text.is_empty() && text.chars().all(allowed)
}
