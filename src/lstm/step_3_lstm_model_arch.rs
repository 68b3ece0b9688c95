// External imports
use burn::config::Config;
use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::tensor::{backend::Backend, Tensor};

// Internal imports
use super::step_2_lstm_cell::LstmCell;

#[derive(Config, Debug)]
pub struct SequenceLstmConfig {
    #[config(default = 1)]
    pub input_size: usize,
    #[config(default = 50)]
    pub hidden_size: usize,
}

impl SequenceLstmConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> SequenceLstm<B> {
        SequenceLstm {
            lstm: LstmCell::new(self.input_size, self.hidden_size, device),
            output: LinearConfig::new(self.hidden_size, 1).init(device),
        }
    }
}

/// One recurrent layer followed by a scalar regression head
#[derive(Module, Debug)]
pub struct SequenceLstm<B: Backend> {
    lstm: LstmCell<B>,
    output: Linear<B>,
}

impl<B: Backend> SequenceLstm<B> {
    /// `[batch, lookback, 1]` windows to `[batch, 1]` next-step values
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 2> {
        let last_hidden = self.lstm.forward(x);
        self.output.forward(last_hidden)
    }

    pub fn hidden_size(&self) -> usize {
        self.lstm.hidden_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::{NdArray, NdArrayDevice};

    #[test]
    fn test_forward_shape() {
        let device = NdArrayDevice::Cpu;
        let model = SequenceLstmConfig::new().with_hidden_size(16).init::<NdArray>(&device);
        let x = Tensor::<NdArray, 3>::zeros([3, 12, 1], &device);

        assert_eq!(model.forward(x).dims(), [3, 1]);
        assert_eq!(model.hidden_size(), 16);
    }

    #[test]
    fn test_default_hidden_size() {
        assert_eq!(
            SequenceLstmConfig::new().hidden_size,
            crate::constants::DEFAULT_HIDDEN_SIZE
        );
    }
}
