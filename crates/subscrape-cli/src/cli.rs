// SPDX-License-Identifier: GPL-3.0

use std::{fmt::Display, io::Result};
#[cfg(test)]
pub(crate) use tests::MockCli;

pub(crate) mod traits {
	use std::{fmt::Display, io::Result};

	/// A command line interface.
	pub trait Cli {
		/// Constructs a new [`Confirm`] prompt.
		fn confirm(&mut self, prompt: impl Display) -> impl Confirm;
		/// Prints an error message.
		fn error(&mut self, text: impl Display) -> Result<()>;
		/// Prints an info message.
		fn info(&mut self, text: impl Display) -> Result<()>;
		/// Prints a header of the prompt sequence.
		fn intro(&mut self, title: impl Display) -> Result<()>;
		/// Constructs a new [`MultiSelect`] prompt.
		fn multiselect<T: Clone + Eq>(&mut self, prompt: impl Display) -> impl MultiSelect<T>;
		/// Prints a footer of the prompt sequence.
		fn outro(&mut self, message: impl Display) -> Result<()>;
		/// Prints a footer of the prompt sequence with a failure style.
		fn outro_cancel(&mut self, message: impl Display) -> Result<()>;
		/// Prints a success message.
		fn success(&mut self, message: impl Display) -> Result<()>;
		/// Prints a warning message.
		fn warning(&mut self, message: impl Display) -> Result<()>;
		/// Constructs a new [`Spinner`].
		fn spinner(&mut self) -> Box<dyn Spinner + Send>;
	}

	/// A spinner.
	pub trait Spinner: Send {
		/// Starts the spinner.
		fn start(&self, message: &str);
		/// Stops the spinner.
		fn stop(&self, message: &str);
		/// Stops the spinner with an error message.
		fn error(&self, message: &str);
	}

	/// A confirmation prompt.
	pub trait Confirm {
		/// Sets the initially selected value.
		fn initial_value(self, initial_value: bool) -> Self;
		/// Starts the prompt interaction.
		fn interact(&mut self) -> Result<bool>;
	}

	/// A multi-select prompt.
	pub trait MultiSelect<T> {
		/// Starts the prompt interaction.
		fn interact(&mut self) -> Result<Vec<T>>;
		/// Adds an item to the list of options.
		fn item(self, value: T, label: impl Display, hint: impl Display) -> Self;
		/// Sets whether the input is required.
		fn required(self, required: bool) -> Self;
	}
}

/// A command line interface using cliclack.
pub(crate) struct Cli;

impl traits::Cli for Cli {
	/// Constructs a new [`Confirm`] prompt.
	fn confirm(&mut self, prompt: impl Display) -> impl traits::Confirm {
		Confirm(cliclack::confirm(prompt))
	}

	/// Prints an error message.
	fn error(&mut self, text: impl Display) -> Result<()> {
		cliclack::log::error(text)
	}

	/// Prints an info message.
	fn info(&mut self, text: impl Display) -> Result<()> {
		cliclack::log::info(text)
	}

	/// Prints a header of the prompt sequence.
	fn intro(&mut self, title: impl Display) -> Result<()> {
		cliclack::clear_screen()?;
		cliclack::set_theme(crate::style::Theme);
		cliclack::intro(format!("{}: {title}", console::style(" Subscrape ").black().on_magenta()))
	}

	/// Constructs a new [`MultiSelect`] prompt.
	fn multiselect<T: Clone + Eq>(&mut self, prompt: impl Display) -> impl traits::MultiSelect<T> {
		MultiSelect::<T>(cliclack::multiselect(prompt))
	}

	/// Prints a footer of the prompt sequence.
	fn outro(&mut self, message: impl Display) -> Result<()> {
		cliclack::outro(message)
	}

	/// Prints a footer of the prompt sequence with a failure style.
	fn outro_cancel(&mut self, message: impl Display) -> Result<()> {
		cliclack::outro_cancel(message)
	}

	/// Prints a success message.
	fn success(&mut self, message: impl Display) -> Result<()> {
		cliclack::log::success(message)
	}

	/// Prints a warning message.
	fn warning(&mut self, message: impl Display) -> Result<()> {
		cliclack::log::warning(message)
	}

	fn spinner(&mut self) -> Box<dyn traits::Spinner + Send> {
		Box::new(Spinner(cliclack::spinner()))
	}
}

/// A spinner using cliclack.
struct Spinner(cliclack::ProgressBar);

impl traits::Spinner for Spinner {
	fn start(&self, message: &str) {
		self.0.start(message);
	}

	fn stop(&self, message: &str) {
		self.0.stop(message);
	}

	fn error(&self, message: &str) {
		self.0.error(message);
	}
}

/// A confirmation prompt using cliclack.
struct Confirm(cliclack::Confirm);

impl traits::Confirm for Confirm {
	/// Sets the initially selected value.
	fn initial_value(mut self, initial_value: bool) -> Self {
		self.0 = self.0.initial_value(initial_value);
		self
	}

	/// Starts the prompt interaction.
	fn interact(&mut self) -> Result<bool> {
		self.0.interact()
	}
}

/// A multi-select prompt using cliclack.
struct MultiSelect<T: Clone + Eq>(cliclack::MultiSelect<T>);

impl<T: Clone + Eq> traits::MultiSelect<T> for MultiSelect<T> {
	/// Starts the prompt interaction.
	fn interact(&mut self) -> Result<Vec<T>> {
		self.0.interact()
	}

	/// Adds an item to the list of options.
	fn item(mut self, value: T, label: impl Display, hint: impl Display) -> Self {
		self.0 = self.0.item(value, label, hint);
		self
	}

	/// Sets whether the input is required.
	fn required(mut self, required: bool) -> Self {
		self.0 = self.0.required(required);
		self
	}
}
