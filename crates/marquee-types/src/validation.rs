use chrono::{Datelike, Utc};

use crate::models::{Movie, User};
use crate::validator::{EMAIL_RX, Validator, matches, unique};

/// The year of the first motion picture.
pub const MIN_MOVIE_YEAR: i32 = 1888;

pub const MAX_NAME_BYTES: usize = 500;

/// bcrypt-era ceiling kept so existing clients see the same limits.
pub const MIN_PASSWORD_BYTES: usize = 8;
pub const MAX_PASSWORD_BYTES: usize = 72;

pub fn validate_movie(v: &mut Validator, movie: &Movie) {
    let title_chars = movie.title.chars().count();
    v.check(title_chars > 3, "title", "must be more than 3 characters long");
    v.check(title_chars < 50, "title", "must be less than 50 characters long");

    v.check(unique(&movie.genres), "genres", "must not contain duplicate values");

    v.check(movie.year != 0, "year", "must be provided");
    v.check(movie.year >= MIN_MOVIE_YEAR, "year", "must be greater than 1888");
    v.check(movie.year <= Utc::now().year(), "year", "must not be in the future");

    v.check(!movie.runtime.is_zero(), "runtime", "must be provided");
    v.check(movie.runtime.minutes() > 0, "runtime", "must be a positive integer");
}

pub fn validate_email(v: &mut Validator, email: &str) {
    v.check(!email.is_empty(), "email", "must be provided");
    v.check(matches(email, &EMAIL_RX), "email", "must be a valid email address");
}

pub fn validate_password_plaintext(v: &mut Validator, password: &str) {
    v.check(!password.is_empty(), "password", "must be provided");
    v.check(password.len() >= MIN_PASSWORD_BYTES, "password", "must be at least 8 bytes long");
    v.check(password.len() <= MAX_PASSWORD_BYTES, "password", "must not be more than 72 bytes long");
}

/// Checks name, email and the transient plaintext password. A user whose
/// plaintext has already been cleared fails the password rule.
pub fn validate_user(v: &mut Validator, user: &User) {
    v.check(!user.name.is_empty(), "name", "must be provided");
    v.check(user.name.len() <= MAX_NAME_BYTES, "name", "must not be more than 500 bytes long");

    validate_email(v, &user.email);

    match user.password.plaintext() {
        Some(plaintext) => validate_password_plaintext(v, plaintext),
        None => v.add_error("password", "must be provided"),
    }
}

pub fn validate_login(v: &mut Validator, email: &str, password: &str) {
    v.check(matches(email, &EMAIL_RX), "email", "must be a valid email address");
    validate_password_plaintext(v, password);
}
