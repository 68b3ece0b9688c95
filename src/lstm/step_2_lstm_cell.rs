// External imports
use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::tensor::{activation, backend::Backend, Tensor};

/// Single-direction LSTM layer with the four gates fused into one projection
#[derive(Module, Debug)]
pub struct LstmCell<B: Backend> {
    input_size: usize,
    hidden_size: usize,
    // input, forget, cell and output gates stacked along the last dimension
    input_weights: Linear<B>,
    hidden_weights: Linear<B>,
}

impl<B: Backend> LstmCell<B> {
    pub fn new(input_size: usize, hidden_size: usize, device: &B::Device) -> Self {
        let gate_size = 4 * hidden_size;
        let input_weights = LinearConfig::new(input_size, gate_size).init(device);
        let hidden_weights = LinearConfig::new(hidden_size, gate_size)
            .with_bias(false)
            .init(device);

        Self {
            input_size,
            hidden_size,
            input_weights,
            hidden_weights,
        }
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    fn gate(gates: &Tensor<B, 3>, index: usize, batch_size: usize, hidden_size: usize) -> Tensor<B, 2> {
        gates
            .clone()
            .narrow(1, index, 1)
            .reshape([batch_size, hidden_size])
    }

    /// Runs the sequence `[batch, seq_len, input]` from zero state and
    /// returns the final hidden state `[batch, hidden]`
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 2> {
        let device = x.device();
        let [batch_size, seq_len, _] = x.dims();

        let mut h = Tensor::zeros([batch_size, self.hidden_size], &device);
        let mut c = Tensor::zeros([batch_size, self.hidden_size], &device);

        for t in 0..seq_len {
            let x_t = x
                .clone()
                .narrow(1, t, 1)
                .reshape([batch_size, self.input_size]);

            let gates = self.input_weights.forward(x_t) + self.hidden_weights.forward(h);
            let gates = gates.reshape([batch_size, 4, self.hidden_size]);

            let i = activation::sigmoid(Self::gate(&gates, 0, batch_size, self.hidden_size));
            let f = activation::sigmoid(Self::gate(&gates, 1, batch_size, self.hidden_size));
            let g = activation::tanh(Self::gate(&gates, 2, batch_size, self.hidden_size));
            let o = activation::sigmoid(Self::gate(&gates, 3, batch_size, self.hidden_size));

            c = f * c + i * g;
            h = o * activation::tanh(c.clone());
        }

        h
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::{NdArray, NdArrayDevice};

    #[test]
    fn test_output_shape_is_last_hidden_state() {
        let device = NdArrayDevice::Cpu;
        let cell = LstmCell::<NdArray>::new(1, 8, &device);
        let x = Tensor::<NdArray, 3>::zeros([4, 6, 1], &device);

        let h = cell.forward(x);
        assert_eq!(h.dims(), [4, 8]);
    }

    #[test]
    fn test_hidden_state_is_bounded() {
        let device = NdArrayDevice::Cpu;
        let cell = LstmCell::<NdArray>::new(1, 5, &device);
        let x = Tensor::<NdArray, 3>::ones([2, 10, 1], &device) * 100.0;

        let values = cell.forward(x).into_data().convert::<f32>().to_vec::<f32>().unwrap();
        assert!(values.iter().all(|v| v.abs() <= 1.0));
    }
}
